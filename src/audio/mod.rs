pub mod turn;
pub mod wav;

pub use turn::{sample_rate_from_mime, TurnAudio, DEFAULT_SAMPLE_RATE};
pub use wav::encode_wav;
