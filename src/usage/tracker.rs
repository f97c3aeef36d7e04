use serde_json::Value;
use tracing::debug;

use super::pricing::total_session_cost;
use super::report::{CallType, TokenUsage, UsageReport};

/// Tag applied to live turn reports when the caller gives none
pub const DEFAULT_LIVE_TAG: &str = "slide_conversation";

/// Usage counters pulled out of a raw transport snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    /// Cumulative: whole history plus the new input
    pub prompt_tokens: u64,
    /// Response tokens plus any thinking tokens
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

const PROMPT_KEYS: &[&str] = &["promptTokenCount", "prompt_token_count"];
const COMPLETION_KEYS: &[&str] = &[
    "responseTokenCount",
    "response_token_count",
    "candidatesTokenCount",
    "candidates_token_count",
];
const THOUGHTS_KEYS: &[&str] = &["thoughtsTokenCount", "thoughts_token_count"];
const TOTAL_KEYS: &[&str] = &["totalTokenCount", "total_token_count"];

/// Normalize a usage snapshot from any transport revision.
///
/// The first alias holding a number wins; absent counters read as zero. When the
/// snapshot has no total, prompt plus completion stands in for it.
pub fn normalize_usage(raw: &Value) -> UsageCounters {
    let prompt_tokens = first_count(raw, PROMPT_KEYS).unwrap_or(0);
    let completion_tokens = first_count(raw, COMPLETION_KEYS)
        .unwrap_or(0)
        .saturating_add(first_count(raw, THOUGHTS_KEYS).unwrap_or(0));
    let total_tokens = first_count(raw, TOTAL_KEYS)
        .unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens));

    UsageCounters {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    }
}

fn first_count(raw: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let value = raw.get(*key)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0).round() as u64))
    })
}

/// Turns cumulative live usage snapshots into per-turn reports.
///
/// The report list holds at most one `LiveTurnOngoing` entry and it is always the
/// last one; it is replaced in place until the turn is finalized.
#[derive(Debug, Clone, Default)]
pub struct UsageDeltaTracker {
    previous_cumulative_total: u64,
    /// Cumulative total of the latest ongoing snapshot, committed as the
    /// baseline if the turn ends without a final one
    ongoing_cumulative_total: Option<u64>,
    reports: Vec<UsageReport>,
    estimated_cost: f64,
}

impl UsageDeltaTracker {
    pub fn new(initial_reports: Vec<UsageReport>) -> Self {
        let estimated_cost = total_session_cost(&initial_reports);
        Self {
            previous_cumulative_total: 0,
            ongoing_cumulative_total: None,
            reports: initial_reports,
            estimated_cost,
        }
    }

    /// Record a usage snapshot for the live turn in progress and return the
    /// usage attributable to this turn alone.
    pub fn record_turn_usage(
        &mut self,
        model_id: &str,
        raw: &Value,
        is_final: bool,
        tag: Option<&str>,
    ) -> TokenUsage {
        let counters = normalize_usage(raw);

        // Cumulative counters occasionally stall between polls
        let input_delta = counters
            .prompt_tokens
            .saturating_sub(self.previous_cumulative_total);
        let turn_usage = TokenUsage::new(input_delta, counters.completion_tokens);

        let call_type = if is_final {
            CallType::LiveTurn
        } else {
            CallType::LiveTurnOngoing
        };
        let report = UsageReport::new(model_id, turn_usage, call_type)
            .with_tag(tag.unwrap_or(DEFAULT_LIVE_TAG));

        match self.reports.last_mut() {
            Some(last) if last.is_ongoing() => *last = report,
            _ => self.reports.push(report),
        }

        if is_final {
            debug!(
                "Live turn finalized: +{} input, {} output (baseline {} -> {})",
                input_delta,
                counters.completion_tokens,
                self.previous_cumulative_total,
                counters.total_tokens
            );
            self.previous_cumulative_total = counters.total_tokens;
            self.ongoing_cumulative_total = None;
        } else {
            self.ongoing_cumulative_total = Some(counters.total_tokens);
        }

        self.refresh_cost();
        turn_usage
    }

    /// Append a one-shot report (plan generation, grouping, markdown fix)
    pub fn add_report(&mut self, report: UsageReport) {
        self.reports.push(report);
        self.refresh_cost();
    }

    /// Promote a dangling ongoing report to final, e.g. when a turn completes
    /// without its own usage or the stream drops mid-turn. The last ongoing
    /// snapshot becomes the baseline for the next turn. Returns the settled
    /// usage, if there was an ongoing report.
    pub fn settle_ongoing(&mut self) -> Option<TokenUsage> {
        let pending_total = self.ongoing_cumulative_total.take();
        let last = self.reports.last_mut().filter(|last| last.is_ongoing())?;
        last.call_type = CallType::LiveTurn;
        let usage = last.usage;

        if let Some(total) = pending_total {
            self.previous_cumulative_total = total;
        }
        Some(usage)
    }

    /// Forget the cumulative baseline when the model context starts over
    pub fn reset_baseline(&mut self) {
        self.previous_cumulative_total = 0;
        self.ongoing_cumulative_total = None;
    }

    pub fn previous_cumulative_total(&self) -> u64 {
        self.previous_cumulative_total
    }

    pub fn reports(&self) -> &[UsageReport] {
        &self.reports
    }

    pub fn estimated_cost(&self) -> f64 {
        self.estimated_cost
    }

    fn refresh_cost(&mut self) {
        self.estimated_cost = total_session_cost(&self.reports);
    }
}
