pub mod audio;
pub mod config;
pub mod http;
pub mod imaging;
pub mod live;
pub mod nats;
pub mod notify;
pub mod persistence;
pub mod plan;
pub mod schedule;
pub mod session;
pub mod transcript;
pub mod usage;

pub use audio::TurnAudio;
pub use config::Config;
pub use http::{create_router, AppState};
pub use imaging::{ImageOptimizer, RasterOptimizer};
pub use live::{
    build_session_setup, LiveTransport, SendOptions, SendOutcome, ServerMessage, SessionSetup,
    TurnBuilder,
};
pub use nats::NatsTransport;
pub use notify::{Notification, NotificationKind, Notifier};
pub use persistence::{FileSessionStore, MemorySessionStore, SessionSaver, SessionStore};
pub use plan::{assemble_session, parse_lecture_plan, PlanManifest};
pub use session::{
    LectureConfig, LectureSession, LiveServices, LiveSession, LiveSessionConfig, LiveState,
    SessionStats, Slide, StartMode,
};
pub use transcript::{ChatAttachment, TranscriptEntry, TranscriptReconciler};
pub use usage::{UsageDeltaTracker, UsageReport, UsageSummary};
