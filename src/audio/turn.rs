use anyhow::{Context, Result};
use base64::Engine;
use tracing::debug;

use super::wav::encode_wav;

/// Output rate of the live model when the chunk mime type does not say
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Extract `rate=N` from a mime type such as `audio/pcm;rate=24000`
pub fn sample_rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

/// Accumulates the model's spoken audio for the assistant turn in progress
///
/// Chunks arrive as base64 little-endian 16-bit mono PCM. A sample split across
/// two chunks is carried over.
#[derive(Debug)]
pub struct TurnAudio {
    samples: Vec<i16>,
    sample_rate: u32,
    carry: Option<u8>,
}

impl Default for TurnAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnAudio {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            carry: None,
        }
    }

    /// Append one inline chunk. Non-PCM payloads are ignored.
    pub fn push_chunk(&mut self, mime_type: &str, data: &str) -> Result<()> {
        if !mime_type.starts_with("audio/pcm") {
            debug!("Ignoring non-PCM model audio: {}", mime_type);
            return Ok(());
        }

        if let Some(rate) = sample_rate_from_mime(mime_type) {
            self.sample_rate = rate;
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .context("Invalid base64 in model audio chunk")?;

        let mut bytes = bytes.as_slice();
        if let Some(low) = self.carry.take() {
            if let Some((&high, rest)) = bytes.split_first() {
                self.samples.push(i16::from_le_bytes([low, high]));
                bytes = rest;
            } else {
                self.carry = Some(low);
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        self.samples
            .extend(pairs.by_ref().map(|pair| i16::from_le_bytes([pair[0], pair[1]])));
        if let [odd] = pairs.remainder() {
            self.carry = Some(*odd);
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate.max(1))
    }

    /// Drop buffered audio without encoding it
    pub fn clear(&mut self) {
        self.samples.clear();
        self.carry = None;
    }

    /// Encode the buffered turn as base64 WAV and reset the buffer.
    ///
    /// Returns `None` when nothing was buffered.
    pub fn finish(&mut self) -> Result<Option<String>> {
        if self.samples.is_empty() {
            self.carry = None;
            return Ok(None);
        }

        let samples = std::mem::take(&mut self.samples);
        self.carry = None;

        let wav = encode_wav(&samples, self.sample_rate, 1)?;
        Ok(Some(base64::engine::general_purpose::STANDARD.encode(wav)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_sample_rate_from_mime() {
        assert_eq!(sample_rate_from_mime("audio/pcm;rate=16000"), Some(16_000));
        assert_eq!(sample_rate_from_mime("audio/pcm; rate=24000"), Some(24_000));
        assert_eq!(sample_rate_from_mime("audio/pcm"), None);
    }

    #[test]
    fn test_samples_split_across_chunks() {
        let mut audio = TurnAudio::new();
        // 0x0201, 0x0403 split as [01] [02 03 04]
        audio.push_chunk("audio/pcm;rate=24000", &chunk(&[0x01])).unwrap();
        assert!(audio.is_empty());
        audio.push_chunk("audio/pcm;rate=24000", &chunk(&[0x02, 0x03, 0x04])).unwrap();
        assert_eq!(audio.samples, vec![0x0201, 0x0403]);
    }

    #[test]
    fn test_finish_encodes_wav_and_resets() {
        let mut audio = TurnAudio::new();
        audio.push_chunk("audio/pcm", &chunk(&[0u8; 480])).unwrap();
        assert_eq!(audio.duration_ms(), 10);

        let wav = audio.finish().unwrap().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(wav).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert!(audio.is_empty());
        assert!(audio.finish().unwrap().is_none());
    }

    #[test]
    fn test_non_pcm_is_ignored() {
        let mut audio = TurnAudio::new();
        audio.push_chunk("image/png", &chunk(&[1, 2])).unwrap();
        assert!(audio.is_empty());
        assert!(audio.push_chunk("audio/pcm", "!!!").is_err());
    }
}
