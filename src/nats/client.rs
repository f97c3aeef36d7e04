use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{GatewayEnvelope, LiveSubjects, ServerEnvelope};
use crate::live::{
    ClientContent, LiveTransport, RealtimeInput, ServerMessage, SessionSetup, ToolResponse,
};

const INBOUND_BUFFER: usize = 128;

/// Live transport bridged over NATS to a gateway that holds the model stream
pub struct NatsTransport {
    client: Client,
    session_id: String,
    subjects: LiveSubjects,
    open: Arc<AtomicBool>,
    sequence: AtomicU64,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl NatsTransport {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self::with_client(client, session_id))
    }

    pub fn with_client(client: Client, session_id: String) -> Self {
        Self {
            subjects: LiveSubjects::new(&session_id),
            client,
            session_id,
            open: Arc::new(AtomicBool::new(false)),
            sequence: AtomicU64::new(0),
            forwarder: Mutex::new(None),
        }
    }

    pub fn subjects(&self) -> &LiveSubjects {
        &self.subjects
    }

    async fn publish<T: Serialize>(&self, subject: String, payload: T) -> Result<()> {
        let envelope = GatewayEnvelope {
            session_id: self.session_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload,
        };

        let bytes = serde_json::to_vec(&envelope)?;
        let len = bytes.len();

        self.client
            .publish(subject.clone(), bytes.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        debug!(
            "Published to {} (seq={}, bytes={})",
            subject, envelope.sequence, len
        );

        Ok(())
    }

    async fn publish_open<T: Serialize>(&self, subject: String, payload: T) -> Result<()> {
        if !self.is_open() {
            anyhow::bail!("Live stream for {} is not open", self.session_id);
        }
        self.publish(subject, payload).await
    }
}

#[async_trait::async_trait]
impl LiveTransport for NatsTransport {
    async fn connect(&self, setup: &SessionSetup) -> Result<mpsc::Receiver<ServerMessage>> {
        if let Some(previous) = self.forwarder.lock().await.take() {
            previous.abort();
        }

        let subject = self.subjects.server();
        info!("Subscribing to server messages on {}", subject);

        // Subscribe before publishing setup so no early message is missed
        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to server messages")?;

        self.publish(self.subjects.setup(), setup).await?;
        self.client
            .flush()
            .await
            .context("Failed to flush session setup")?;

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let open = Arc::clone(&self.open);
        open.store(true, Ordering::SeqCst);

        let forwarder = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let envelope: ServerEnvelope = match serde_json::from_slice(&message.payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("Ignoring malformed server message on {}: {}", subject, e);
                        continue;
                    }
                };

                if envelope.closed {
                    info!("Gateway closed live stream for {}", envelope.session_id);
                    break;
                }

                if let Some(message) = envelope.message {
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
            }

            open.store(false, Ordering::SeqCst);
            debug!("Server message forwarding stopped for {}", subject);
        });

        *self.forwarder.lock().await = Some(forwarder);

        Ok(rx)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_client_content(&self, content: ClientContent) -> Result<()> {
        self.publish_open(self.subjects.client_content(), content).await
    }

    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()> {
        self.publish_open(self.subjects.realtime_input(), input).await
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.publish_open(self.subjects.tool_response(), response).await
    }

    async fn close(&self) -> Result<()> {
        info!("Closing live stream for {}", self.session_id);

        let was_open = self.open.swap(false, Ordering::SeqCst);
        if let Some(forwarder) = self.forwarder.lock().await.take() {
            forwarder.abort();
        }

        if was_open {
            self.publish(self.subjects.close(), serde_json::json!({})).await?;
            // async-nats handles connection cleanup on drop
            self.client.flush().await.context("Failed to flush close")?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}
