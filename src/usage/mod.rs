//! Token usage accounting and cost estimation

mod pricing;
mod report;
mod summary;
mod tracker;

pub use pricing::{
    estimate_cost, live_models, lookup, total_session_cost, ModelKind, ModelPricing,
    DEFAULT_MODEL_COST, MARKDOWN_FIXER_MODEL, MODEL_REGISTRY, PLAN_GENERATION_MODEL,
};
pub use report::{CallType, TokenUsage, UsageReport};
pub use summary::{format_cost, tag_label, TagTotals, UsageSummary};
pub use tracker::{normalize_usage, UsageCounters, UsageDeltaTracker, DEFAULT_LIVE_TAG};
