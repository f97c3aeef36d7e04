//! Lecture session management
//!
//! This module provides the lecture aggregate and the `LiveSession` actor that manages:
//! - Connecting (and reconnecting) the streaming model transport
//! - Reconciling transcript and usage events in arrival order
//! - Building outgoing turns for user messages and slide navigation
//! - Debounced persistence and the final flush on teardown

mod config;
mod model;
mod session;
mod stats;

pub use config::{ImageOptimizationSettings, LectureConfig, LiveSessionConfig, DEFAULT_LIVE_MODEL};
pub use model::{
    generate_session_id, CanvasBlock, CanvasBlockKind, LectureConfigSummary, LectureSession,
    ParsedSlide, SessionMetadata, Slide, SlideGroup,
};
pub use session::{explain_slide_texts, LiveServices, LiveSession};
pub use stats::{LiveState, SessionStats, StartMode};
