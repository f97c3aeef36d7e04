use serde::{Deserialize, Serialize};

use crate::live::ServerMessage;

/// Outbound message published to the live gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayEnvelope<T> {
    pub session_id: String,
    pub sequence: u64,
    pub timestamp: String, // RFC3339 timestamp
    pub payload: T,
}

/// Inbound message relayed by the live gateway from the model
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub session_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<ServerMessage>,
    /// Gateway lost (or closed) the model connection
    #[serde(default)]
    pub closed: bool,
}

/// Subjects for one lecture session
///
/// Session ids may contain dots (file names), which NATS treats as token
/// separators, so ids are folded into a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSubjects {
    prefix: String,
}

impl LiveSubjects {
    pub fn new(session_id: &str) -> Self {
        let token: String = session_id
            .chars()
            .map(|c| match c {
                '.' | '*' | '>' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect();
        Self {
            prefix: format!("live.{}", token),
        }
    }

    pub fn setup(&self) -> String {
        format!("{}.setup", self.prefix)
    }

    pub fn client_content(&self) -> String {
        format!("{}.client_content", self.prefix)
    }

    pub fn realtime_input(&self) -> String {
        format!("{}.realtime_input", self.prefix)
    }

    pub fn tool_response(&self) -> String {
        format!("{}.tool_response", self.prefix)
    }

    pub fn close(&self) -> String {
        format!("{}.close", self.prefix)
    }

    /// Server messages flow back on this subject
    pub fn server(&self) -> String {
        format!("{}.server", self.prefix)
    }
}
