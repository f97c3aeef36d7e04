use std::sync::Arc;

use tracing::{debug, info, warn};

use super::messages::{ClientContent, Part, RealtimeInput};
use super::transport::LiveTransport;
use crate::imaging::{DataUrl, ImageOptimizer};
use crate::session::{ImageOptimizationSettings, LectureConfig, Slide};
use crate::transcript::ChatAttachment;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Text of an outgoing turn: one string or an ordered list
#[derive(Debug, Clone, PartialEq)]
pub enum TurnText {
    Single(String),
    Many(Vec<String>),
}

impl TurnText {
    /// One text part per string, in order. Blank strings are dropped so a turn
    /// never carries an empty text part.
    fn into_parts(self) -> Vec<Part> {
        let texts = match self {
            TurnText::Single(text) => vec![text],
            TurnText::Many(texts) => texts,
        };
        texts
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(Part::text)
            .collect()
    }
}

impl From<&str> for TurnText {
    fn from(text: &str) -> Self {
        TurnText::Single(text.to_string())
    }
}

impl From<String> for TurnText {
    fn from(text: String) -> Self {
        TurnText::Single(text)
    }
}

impl From<Vec<String>> for TurnText {
    fn from(texts: Vec<String>) -> Self {
        TurnText::Many(texts)
    }
}

/// What goes into one outgoing user turn
#[derive(Debug, Clone)]
pub struct SendOptions<'a> {
    pub slide: Option<&'a Slide>,
    pub text: Option<TurnText>,
    pub attachments: &'a [ChatAttachment],
    pub turn_complete: bool,
}

impl Default for SendOptions<'_> {
    fn default() -> Self {
        Self {
            slide: None,
            text: None,
            attachments: &[],
            turn_complete: true,
        }
    }
}

impl<'a> SendOptions<'a> {
    pub fn text(text: impl Into<TurnText>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_slide(mut self, slide: &'a Slide) -> Self {
        self.slide = Some(slide);
        self
    }

    pub fn with_attachments(mut self, attachments: &'a [ChatAttachment]) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_turn_complete(mut self, turn_complete: bool) -> Self {
        self.turn_complete = turn_complete;
        self
    }
}

/// Which path a send took. Callers may inspect it but never have to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Structured send failed; parts went out as realtime input
    SentViaFallback,
    /// Stream closed; nothing was sent
    NotOpen,
    /// Turn had no parts; nothing was sent
    Empty,
}

/// Assembles multimodal user turns and delivers them over a [`LiveTransport`]
#[derive(Clone)]
pub struct TurnBuilder {
    optimizer: Arc<dyn ImageOptimizer>,
    image_settings: Option<ImageOptimizationSettings>,
    force_text_only: bool,
}

impl TurnBuilder {
    pub fn new(
        optimizer: Arc<dyn ImageOptimizer>,
        image_settings: Option<ImageOptimizationSettings>,
        force_text_only: bool,
    ) -> Self {
        Self {
            optimizer,
            image_settings,
            force_text_only,
        }
    }

    pub fn from_config(config: &LectureConfig, optimizer: Arc<dyn ImageOptimizer>) -> Self {
        Self::new(
            optimizer,
            config.image_optimization,
            config.force_text_only,
        )
    }

    /// Build the ordered parts: slide image, canvas context, attachments, text
    pub async fn build_parts(&self, options: SendOptions<'_>) -> Vec<Part> {
        let mut parts = Vec::new();

        if let Some(slide) = options.slide {
            if slide.has_images && !self.force_text_only {
                let data_url = self.optimize(&slide.image_data_url).await;
                match image_part(&data_url, None) {
                    Some(part) => parts.push(part),
                    None => warn!("Slide {} has no usable image payload", slide.page_number),
                }
            } else {
                info!(
                    "Sending slide {} as text only (has_images={}, force_text_only={})",
                    slide.page_number, slide.has_images, self.force_text_only
                );
            }

            if let Some(blocks) = slide.canvas_content.as_ref().filter(|b| !b.is_empty()) {
                match serde_json::to_string(blocks) {
                    Ok(json) => parts.push(Part::text(format!("Context: Canvas Content: {}", json))),
                    Err(e) => warn!("Failed to serialize canvas content: {}", e),
                }
            }
        }

        for attachment in options.attachments {
            if !attachment.kind.carries_image() {
                debug!("Skipping {:?} attachment {}", attachment.kind, attachment.id);
                continue;
            }

            let data_url = self.optimize(&attachment.data).await;
            match image_part(&data_url, Some(attachment.mime_type.as_str())) {
                Some(part) => parts.push(part),
                None => warn!("Attachment {} has no usable image payload", attachment.id),
            }
        }

        if let Some(text) = options.text {
            parts.extend(text.into_parts());
        }

        parts
    }

    /// Build and deliver one user turn
    pub async fn send(&self, transport: &dyn LiveTransport, options: SendOptions<'_>) -> SendOutcome {
        if !transport.is_open() {
            debug!("Live stream not open; dropping outgoing turn");
            return SendOutcome::NotOpen;
        }

        let turn_complete = options.turn_complete;
        let parts = self.build_parts(options).await;
        if parts.is_empty() {
            warn!("Refusing to send a turn with no parts");
            return SendOutcome::Empty;
        }

        deliver(transport, parts, turn_complete).await
    }

    /// Run the optimizer off the async runtime; any failure yields the original
    async fn optimize(&self, data_url: &str) -> String {
        let Some(settings) = self.image_settings else {
            return data_url.to_string();
        };

        let optimizer = Arc::clone(&self.optimizer);
        let input = data_url.to_string();
        let result =
            tokio::task::spawn_blocking(move || optimizer.optimize(&input, &settings)).await;

        match result {
            Ok(Ok(optimized)) => optimized,
            Ok(Err(e)) => {
                warn!("Image optimization failed, sending original: {:#}", e);
                data_url.to_string()
            }
            Err(e) => {
                warn!("Image optimization task failed, sending original: {}", e);
                data_url.to_string()
            }
        }
    }
}

fn image_part(data_url: &str, fallback_mime: Option<&str>) -> Option<Part> {
    let parsed = DataUrl::parse(data_url)?;
    let mime_type = parsed
        .mime_type
        .or(fallback_mime.filter(|m| !m.is_empty()))
        .unwrap_or(DEFAULT_IMAGE_MIME);
    Some(Part::inline(mime_type, parsed.data))
}

/// Send prepared parts as a structured turn, degrading to realtime input
pub async fn deliver(
    transport: &dyn LiveTransport,
    parts: Vec<Part>,
    turn_complete: bool,
) -> SendOutcome {
    let content = ClientContent::user_turn(parts.clone(), turn_complete);
    let error = match transport.send_client_content(content).await {
        Ok(()) => {
            debug!("Sent turn with {} parts via {}", parts.len(), transport.name());
            return SendOutcome::Sent;
        }
        Err(e) => e,
    };

    warn!("Structured send failed, falling back to realtime input: {:#}", error);

    for part in parts {
        let input = match part {
            Part::Inline { inline_data } => RealtimeInput::Media { media: inline_data },
            Part::Text { text } => RealtimeInput::Text { text },
            Part::Other(_) => continue,
        };
        if let Err(e) = transport.send_realtime_input(input).await {
            debug!("Realtime fallback send failed: {:#}", e);
        }
    }

    if turn_complete {
        if let Err(e) = transport.send_realtime_input(RealtimeInput::end_of_turn()).await {
            debug!("Failed to send end of turn: {:#}", e);
        }
    }

    SendOutcome::SentViaFallback
}
