//! Transcript entries and streaming reconciliation

mod entry;
mod export;
mod reconciler;

pub use entry::{AttachmentKind, ChatAttachment, Speaker, TranscriptEntry};
pub use export::{export_transcript_text, transcript_file_name};
pub use reconciler::{AppendOptions, AppendOutcome, TranscriptReconciler};
