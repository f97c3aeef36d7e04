use tracing::debug;

use super::entry::{ChatAttachment, Speaker, TranscriptEntry};

#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Defaults to the current slide
    pub slide_number: Option<u32>,
    pub attachments: Option<Vec<ChatAttachment>>,
    /// Merge into the last entry when it belongs to the same speaker
    pub update_last_entry: bool,
    pub estimated_cost: Option<f64>,
}

impl AppendOptions {
    pub fn streaming() -> Self {
        Self {
            update_last_entry: true,
            ..Default::default()
        }
    }
}

/// What an append did to the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Blank text, nothing recorded
    Ignored,
    Created,
    /// Last entry text replaced or extended
    Updated,
    /// Duplicate or stale chunk
    Unchanged,
}

/// Merges streaming transcription chunks into a linear transcript.
///
/// Entries are never reordered and chunks from different speakers never merge.
#[derive(Debug, Clone, Default)]
pub struct TranscriptReconciler {
    entries: Vec<TranscriptEntry>,
    current_slide_index: usize,
    assistant_turn_open: bool,
}

impl TranscriptReconciler {
    pub fn new(entries: Vec<TranscriptEntry>, current_slide_index: usize) -> Self {
        Self {
            entries,
            current_slide_index,
            assistant_turn_open: false,
        }
    }

    pub fn append_or_update(
        &mut self,
        text: &str,
        speaker: Speaker,
        options: AppendOptions,
    ) -> AppendOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return AppendOutcome::Ignored;
        }

        let slide_number = options
            .slide_number
            .unwrap_or(self.current_slide_index as u32 + 1);

        if options.update_last_entry {
            if let Some(last) = self.entries.last_mut().filter(|e| e.speaker == speaker) {
                let outcome = merge_chunk(&mut last.text, text, trimmed);
                if last.slide_number.is_none() {
                    last.slide_number = Some(slide_number);
                }
                return outcome;
            }
        }

        self.entries.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            slide_number: Some(slide_number),
            attachments: options.attachments,
            estimated_cost: options.estimated_cost,
            audio_base64: None,
        });
        if speaker == Speaker::Ai {
            self.assistant_turn_open = true;
        }

        AppendOutcome::Created
    }

    /// Record a typed user message. Unlike streaming text, an attachment-only
    /// message still produces an entry.
    pub fn push_user_message(
        &mut self,
        text: &str,
        attachments: Vec<ChatAttachment>,
    ) -> AppendOutcome {
        if text.trim().is_empty() && attachments.is_empty() {
            return AppendOutcome::Ignored;
        }

        self.entries.push(TranscriptEntry {
            speaker: Speaker::User,
            text: text.to_string(),
            slide_number: Some(self.current_slide_index as u32 + 1),
            attachments: (!attachments.is_empty()).then_some(attachments),
            estimated_cost: None,
            audio_base64: None,
        });

        AppendOutcome::Created
    }

    /// Stamp a cost on the most recent entry by `speaker`
    pub fn set_last_entry_cost(&mut self, cost: f64, speaker: Speaker) -> bool {
        match self.entries.iter_mut().rev().find(|e| e.speaker == speaker) {
            Some(entry) => {
                entry.estimated_cost = Some(cost);
                true
            }
            None => false,
        }
    }

    pub fn set_last_entry_audio(&mut self, audio_base64: String, speaker: Speaker) -> bool {
        match self.entries.iter_mut().rev().find(|e| e.speaker == speaker) {
            Some(entry) => {
                entry.audio_base64 = Some(audio_base64);
                true
            }
            None => false,
        }
    }

    pub fn is_assistant_turn_open(&self) -> bool {
        self.assistant_turn_open
    }

    pub fn close_assistant_turn(&mut self) {
        self.assistant_turn_open = false;
    }

    pub fn set_current_slide_index(&mut self, index: usize) {
        self.current_slide_index = index;
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last_entry(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn merge_chunk(existing: &mut String, text: &str, trimmed: &str) -> AppendOutcome {
    if existing.ends_with(trimmed) {
        debug!("Dropping duplicate transcript chunk");
        return AppendOutcome::Unchanged;
    }

    if text.starts_with(existing.as_str()) {
        // Full transcript so far
        *existing = text.to_string();
        AppendOutcome::Updated
    } else if existing.starts_with(text) {
        // Stale chunk arriving after a longer one
        AppendOutcome::Unchanged
    } else {
        // Transport sends pure deltas
        existing.push_str(text);
        AppendOutcome::Updated
    }
}
