use super::entry::{Speaker, TranscriptEntry};

/// Render the transcript as a plain-text document
pub fn export_transcript_text(general_info: &str, entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    out.push_str("AI Lecture Transcript\n=====================\n\n");
    out.push_str("Presentation Overview:\n");
    out.push_str(general_info);
    out.push_str("\n\n---------------------\nConversation History:\n---------------------\n\n");

    let conversation = entries
        .iter()
        .map(|entry| {
            let who = match entry.speaker {
                Speaker::User => "User",
                Speaker::Ai => "AI Lecturer",
            };
            format!("{}: {}", who, entry.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push_str(&conversation);

    out
}

/// `deck.pdf` -> `deck-transcript.txt`
pub fn transcript_file_name(file_name: &str) -> String {
    let base = if file_name.to_ascii_lowercase().ends_with(".pdf") {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };
    format!("{}-transcript.txt", base)
}
