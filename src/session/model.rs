use serde::{Deserialize, Serialize};

use super::config::LectureConfig;
use crate::transcript::TranscriptEntry;
use crate::usage::UsageReport;

/// Kind of a canvas block the assistant attaches to a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasBlockKind {
    Markdown,
    Diagram,
    Ascii,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasBlock {
    #[serde(rename = "type")]
    pub kind: CanvasBlockKind,
    pub content: String,
}

/// Page record produced by the PDF parsing collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSlide {
    /// 1-based page number within its source file
    pub page_number: u32,
    pub image_data_url: String,
    pub text_content: String,
    /// Page contains embedded pictures worth sending to the model
    pub has_images: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// 1-based, renumbered across all files of the lecture
    pub page_number: u32,

    /// Encoded raster; PNG for sessions created before the JPEG switch
    pub image_data_url: String,

    pub text_content: String,

    pub has_images: bool,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_content: Option<Vec<CanvasBlock>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_important: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_file: Option<String>,
}

impl Slide {
    pub fn from_parsed(parsed: ParsedSlide) -> Self {
        Self {
            page_number: parsed.page_number,
            image_data_url: parsed.image_data_url,
            text_content: parsed.text_content,
            has_images: parsed.has_images,
            summary: String::new(),
            canvas_content: None,
            is_important: None,
            origin_file: None,
        }
    }

    pub fn canvas_blocks(&self) -> &[CanvasBlock] {
        self.canvas_content.as_deref().unwrap_or_default()
    }

    pub fn is_important(&self) -> bool {
        self.is_important.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideGroup {
    pub title: String,
    pub slide_numbers: Vec<u32>,
}

/// The lecture aggregate, persisted as a single snapshot keyed by `id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureSession {
    pub id: String,

    /// Display name, source files joined with " & "
    pub file_name: String,

    #[serde(default)]
    pub file_names: Vec<String>,

    /// Unix milliseconds
    pub created_at: i64,

    pub slides: Vec<Slide>,

    #[serde(default)]
    pub general_info: String,

    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,

    /// 0-based index into `slides`
    #[serde(default)]
    pub current_slide_index: usize,

    pub lecture_config: LectureConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_groups: Option<Vec<SlideGroup>>,

    #[serde(default)]
    pub usage_reports: Vec<UsageReport>,
}

impl LectureSession {
    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.current_slide_index)
    }

    /// Lightweight projection without slide media or transcript
    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            file_names: self.file_names.clone(),
            created_at: self.created_at,
            lecture_config: LectureConfigSummary {
                language: self.lecture_config.language.clone(),
                voice: self.lecture_config.voice.clone(),
                model: self.lecture_config.model.clone(),
                prompt: self.lecture_config.prompt.clone(),
            },
            usage_reports: self.usage_reports.clone(),
            slides_count: self.slides.len(),
            general_info: self.general_info.clone(),
            current_slide_index: self.current_slide_index,
            slide_groups: self.slide_groups.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureConfigSummary {
    pub language: String,
    pub voice: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Session browser entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub id: String,
    pub file_name: String,
    pub file_names: Vec<String>,
    pub created_at: i64,
    pub lecture_config: LectureConfigSummary,
    pub usage_reports: Vec<UsageReport>,
    pub slides_count: usize,
    pub general_info: String,
    pub current_slide_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_groups: Option<Vec<SlideGroup>>,
}

/// Build a storage-safe session id: `<file-names>-<unix-millis>`.
pub fn generate_session_id(file_names: &[String], timestamp_ms: i64) -> String {
    let joined = file_names.join("-");

    let mut safe = String::with_capacity(joined.len());
    let mut in_whitespace = false;
    for c in joined.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                safe.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            safe.push(c);
        }
    }

    // Only ASCII survives the filter, so byte truncation is char-safe
    safe.truncate(50);

    format!("{}-{}", safe, timestamp_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_sanitizes_names() {
        let id = generate_session_id(
            &["Intro to ML (v2).pdf".to_string(), "week  3.pdf".to_string()],
            1_700_000_000_000,
        );
        assert_eq!(id, "Intro-to-ML-v2.pdf-week-3.pdf-1700000000000");
    }

    #[test]
    fn test_session_id_caps_name_length() {
        let long = "a".repeat(80);
        let id = generate_session_id(&[long], 42);
        assert_eq!(id, format!("{}-42", "a".repeat(50)));
    }

    #[test]
    fn test_canvas_block_wire_shape() {
        let block = CanvasBlock {
            kind: CanvasBlockKind::Diagram,
            content: "graph TD; A-->B".to_string(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"type":"diagram","content":"graph TD; A-->B"}"#);
    }
}
