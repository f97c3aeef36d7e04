use anyhow::{Context, Result};
use base64::Engine;

/// Borrowed view of a `data:<mime>;base64,<payload>` URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime_type: Option<&'a str>,
    pub data: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Split a data URL at its first comma. Returns `None` when there is no
    /// payload after the comma.
    pub fn parse(url: &'a str) -> Option<Self> {
        let (header, data) = url.split_once(',')?;
        if data.is_empty() {
            return None;
        }

        let mime_type = header
            .strip_prefix("data:")
            .map(|h| h.split(';').next().unwrap_or_default())
            .filter(|m| !m.is_empty());

        Some(Self { mime_type, data })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data)
            .context("Invalid base64 payload in data URL")
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_url() {
        let url = DataUrl::parse("data:image/jpeg;base64,QUJD").unwrap();
        assert_eq!(url.mime_type, Some("image/jpeg"));
        assert_eq!(url.data, "QUJD");
        assert_eq!(url.decode().unwrap(), b"ABC");
    }

    #[test]
    fn test_parse_rejects_missing_payload() {
        assert!(DataUrl::parse("data:image/png;base64,").is_none());
        assert!(DataUrl::parse("not a data url").is_none());
    }

    #[test]
    fn test_parse_without_mime() {
        let url = DataUrl::parse(",QUJD").unwrap();
        assert_eq!(url.mime_type, None);
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/png", b"ABC"), "data:image/png;base64,QUJD");
    }
}
