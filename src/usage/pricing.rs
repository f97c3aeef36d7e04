use super::report::{TokenUsage, UsageReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Streaming model the lecture talks to
    Live,
    /// One-shot calls: plan generation, grouping, markdown fixing
    Auxiliary,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ModelKind,
    /// USD per million prompt tokens
    pub input_per_1m: f64,
    /// USD per million completion tokens
    pub output_per_1m: f64,
}

pub const MODEL_REGISTRY: &[ModelPricing] = &[
    ModelPricing {
        id: "gemini-2.5-flash-native-audio-preview-09-2025",
        name: "Gemini 2.5 Flash Native Audio",
        kind: ModelKind::Live,
        input_per_1m: 0.1,
        output_per_1m: 0.4,
    },
    ModelPricing {
        id: "gemini-2.0-flash-exp",
        name: "Gemini 2.0 Flash",
        kind: ModelKind::Auxiliary,
        input_per_1m: 0.1,
        output_per_1m: 0.4,
    },
    ModelPricing {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro (Plan Gen)",
        kind: ModelKind::Auxiliary,
        input_per_1m: 1.25,
        output_per_1m: 5.0,
    },
];

/// Rate charged for model ids missing from the registry: (input, output) per 1M tokens
pub const DEFAULT_MODEL_COST: (f64, f64) = (0.1, 0.4);

pub const PLAN_GENERATION_MODEL: &str = "gemini-2.5-pro";
pub const MARKDOWN_FIXER_MODEL: &str = "gemini-2.0-flash-exp";

pub fn lookup(model_id: &str) -> Option<&'static ModelPricing> {
    MODEL_REGISTRY.iter().find(|m| m.id == model_id)
}

/// Models selectable for the live session
pub fn live_models() -> impl Iterator<Item = &'static ModelPricing> {
    MODEL_REGISTRY.iter().filter(|m| m.kind == ModelKind::Live)
}

/// Estimated USD cost of one call. Never fails: unknown models use the default
/// rate and a non-finite result counts as zero.
pub fn estimate_cost(model_id: &str, usage: &TokenUsage) -> f64 {
    let (input_rate, output_rate) = lookup(model_id)
        .map(|m| (m.input_per_1m, m.output_per_1m))
        .unwrap_or(DEFAULT_MODEL_COST);

    let input = usage.prompt_tokens as f64 / 1_000_000.0 * input_rate;
    let output = usage.completion_tokens as f64 / 1_000_000.0 * output_rate;

    let total = input + output;
    if total.is_finite() {
        total
    } else {
        0.0
    }
}

pub fn total_session_cost(reports: &[UsageReport]) -> f64 {
    reports
        .iter()
        .map(|r| estimate_cost(&r.model_id, &r.usage))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::CallType;

    #[test]
    fn test_known_model_rates() {
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        let cost = estimate_cost("gemini-2.5-pro", &usage);
        assert!((cost - 6.25).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_default_rate() {
        let usage = TokenUsage::new(2_000_000, 0);
        let cost = estimate_cost("some-future-model", &usage);
        assert!((cost - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_session_cost_sums_reports() {
        let reports = vec![
            UsageReport::new("gemini-2.5-pro", TokenUsage::new(1_000_000, 0), CallType::PlanGen),
            UsageReport::new("gemini-2.0-flash-exp", TokenUsage::new(0, 1_000_000), CallType::MarkdownFix),
        ];
        assert!((total_session_cost(&reports) - 1.65).abs() < 1e-9);
    }

    #[test]
    fn test_live_models_filter() {
        let ids: Vec<_> = live_models().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gemini-2.5-flash-native-audio-preview-09-2025"]);
    }
}
