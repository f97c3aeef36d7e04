use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the live connection behind a lecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveState {
    Idle,
    Connecting,
    Ready,
    /// Assistant is speaking
    Lecturing,
    /// Assistant finished its turn and waits for the user
    Listening,
    Ended,
    Error,
    Disconnected,
}

/// How a live session is (re)started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Fresh lecture, the assistant opens on the current slide
    New,
    /// Reopening a stored lecture that already has a transcript
    Saved,
    /// Reconnecting after the transport dropped
    Disconnected,
}

/// Statistics about a live lecture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: LiveState,

    /// When this live session was spawned
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// 1-based slide number currently shown
    pub current_slide: u32,

    pub total_slides: usize,

    /// Number of transcript entries so far
    pub transcript_entries_count: usize,

    /// Number of usage reports, including a pending ongoing one
    pub usage_reports_count: usize,

    /// Running cost estimate in USD
    pub estimated_cost: f64,

    /// Microphone muted
    pub muted: bool,

    /// Transport can continue the previous context on reconnect
    pub resumable: bool,
}
