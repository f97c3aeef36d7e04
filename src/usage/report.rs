use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// What kind of model call a report accounts for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    PlanGen,
    LiveTurn,
    /// Provisional report for a live turn that is still streaming
    LiveTurnOngoing,
    MarkdownFix,
    Grouping,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub model_id: String,

    pub usage: TokenUsage,

    /// Unix milliseconds
    pub timestamp: i64,

    #[serde(default)]
    pub call_type: CallType,

    /// Free-form cost attribution, e.g. `lecture_plan` or `slide_conversation:3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl UsageReport {
    pub fn new(model_id: impl Into<String>, usage: TokenUsage, call_type: CallType) -> Self {
        Self {
            model_id: model_id.into(),
            usage,
            timestamp: chrono::Utc::now().timestamp_millis(),
            call_type,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_ongoing(&self) -> bool {
        self.call_type == CallType::LiveTurnOngoing
    }
}
