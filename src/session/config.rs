use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default live model for new lectures
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Image optimization applied to outgoing slide images and attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptimizationSettings {
    /// Longest side in pixels after resizing (e.g. 768, 512, 256)
    pub max_dimension: u32,

    /// Convert to grayscale before sending
    pub grayscale: bool,
}

impl Default for ImageOptimizationSettings {
    fn default() -> Self {
        Self {
            max_dimension: 256,
            grayscale: true,
        }
    }
}

/// Per-lecture configuration chosen when the session is created.
///
/// Voice and model are fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureConfig {
    /// Spoken language the assistant must use
    pub language: String,

    /// Prebuilt voice name
    pub voice: String,

    /// Live model identifier
    pub model: String,

    /// Optional user instructions appended to the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_optimization: Option<ImageOptimizationSettings>,

    /// Never send slide images, even when a slide has pictures
    #[serde(default)]
    pub force_text_only: bool,
}

impl Default for LectureConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            voice: "Puck".to_string(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            prompt: None,
            image_optimization: Some(ImageOptimizationSettings::default()),
            force_text_only: false,
        }
    }
}

impl LectureConfig {
    /// Custom prompt, treating a blank string as absent
    pub fn custom_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Timers that drive a live session
#[derive(Debug, Clone)]
pub struct LiveSessionConfig {
    /// Quiet period before a debounced save runs
    /// Default: 2000 ms
    pub save_debounce: Duration,

    /// Delay after an assistant response before the microphone is muted again
    /// Default: 1500 ms
    pub auto_mute_delay: Duration,

    /// Coalescing window for rapid slide navigation
    /// Default: 200 ms
    pub slide_select_debounce: Duration,
}

impl Default for LiveSessionConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(2000),
            auto_mute_delay: Duration::from_millis(1500),
            slide_select_debounce: Duration::from_millis(200),
        }
    }
}
