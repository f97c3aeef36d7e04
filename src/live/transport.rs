use anyhow::Result;
use tokio::sync::mpsc;

use super::messages::{ClientContent, RealtimeInput, ServerMessage, ToolResponse};
use super::setup::SessionSetup;

/// Bidirectional streaming connection to the live model
///
/// Implementations:
/// - NATS: bridges to a gateway process holding the model connection
/// - In tests: scripted fakes recording every outbound payload
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open (or reopen) the stream
    ///
    /// Returns a channel receiver that yields inbound server messages. The
    /// channel closing means the stream ended.
    async fn connect(&self, setup: &SessionSetup) -> Result<mpsc::Receiver<ServerMessage>>;

    /// Whether outbound sends are currently possible
    fn is_open(&self) -> bool;

    /// Structured multi-part turn
    async fn send_client_content(&self, content: ClientContent) -> Result<()>;

    /// Raw realtime input (media chunk, text chunk or event)
    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()>;

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}
