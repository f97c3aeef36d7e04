use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
    /// Cropped region of a slide or canvas
    Selection,
}

impl AttachmentKind {
    /// Only raster kinds are forwarded to the model
    pub fn carries_image(self) -> bool {
        matches!(self, AttachmentKind::Image | AttachmentKind::Selection)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAttachment {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: AttachmentKind,

    /// Data URL for images, raw content for files
    pub data: String,

    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ChatAttachment {
    pub fn image(data_url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::new(AttachmentKind::Image, data_url, mime_type)
    }

    pub fn selection(data_url: impl Into<String>) -> Self {
        Self::new(AttachmentKind::Selection, data_url, "image/png")
    }

    pub fn new(kind: AttachmentKind, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            data: data.into(),
            mime_type: mime_type.into(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    /// Grows while the turn streams, fixed once it closes
    pub text: String,

    /// 1-based slide shown when the entry was spoken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ChatAttachment>>,

    /// USD estimate for the turn that produced this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,

    /// Base64 WAV of the spoken turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}
