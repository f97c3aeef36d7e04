use serde::Serialize;
use std::collections::BTreeMap;

use super::pricing::estimate_cost;
use super::report::UsageReport;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagTotals {
    pub label: String,
    pub cost: f64,
    pub tokens: u64,
    pub count: usize,
}

/// Cost breakdown for the usage report view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub calls: usize,
    pub by_tag: BTreeMap<String, TagTotals>,
}

impl UsageSummary {
    pub fn from_reports(reports: &[UsageReport]) -> Self {
        let mut summary = UsageSummary {
            calls: reports.len(),
            ..Default::default()
        };

        for report in reports {
            let cost = estimate_cost(&report.model_id, &report.usage);
            summary.total_cost += cost;
            summary.total_tokens += report.usage.total_tokens;

            let tag = report.tag.clone().unwrap_or_else(|| "other".to_string());
            let totals = summary.by_tag.entry(tag.clone()).or_insert_with(|| TagTotals {
                label: tag_label(&tag),
                ..Default::default()
            });
            totals.cost += cost;
            totals.tokens += report.usage.total_tokens;
            totals.count += 1;
        }

        summary
    }
}

/// Human-readable name for a cost attribution tag
pub fn tag_label(tag: &str) -> String {
    match tag {
        "grouping" => "Topic Grouping".to_string(),
        "lecture_plan" => "Initial Planning".to_string(),
        "slide_conversation" => "Live Discussion".to_string(),
        "other" => "Miscellaneous".to_string(),
        _ => match tag.strip_prefix("slide_conversation:") {
            Some(slide) => format!("Slide {} Discussion", slide),
            None => tag.to_string(),
        },
    }
}

/// Format a USD amount with enough precision for sub-cent costs
pub fn format_cost(cost: f64) -> String {
    if cost == 0.0 {
        return "$0.00".to_string();
    }

    let formatted = format!("{:.6}", cost);
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < 2 {
        fraction.push('0');
    }

    format!("${}.{}", group_thousands(whole), fraction)
}

fn group_thousands(whole: &str) -> String {
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{CallType, TokenUsage};

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(0.0), "$0.00");
        assert_eq!(format_cost(1.5), "$1.50");
        assert_eq!(format_cost(0.000123), "$0.000123");
        assert_eq!(format_cost(1234.5), "$1,234.50");
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(tag_label("lecture_plan"), "Initial Planning");
        assert_eq!(tag_label("slide_conversation:7"), "Slide 7 Discussion");
        assert_eq!(tag_label("custom"), "custom");
    }

    #[test]
    fn test_summary_groups_by_tag() {
        let reports = vec![
            UsageReport::new("gemini-2.5-pro", TokenUsage::new(100, 50), CallType::PlanGen)
                .with_tag("lecture_plan"),
            UsageReport::new("m", TokenUsage::new(10, 10), CallType::LiveTurn)
                .with_tag("slide_conversation"),
            UsageReport::new("m", TokenUsage::new(5, 5), CallType::LiveTurn)
                .with_tag("slide_conversation"),
            UsageReport::new("m", TokenUsage::new(1, 1), CallType::Other),
        ];

        let summary = UsageSummary::from_reports(&reports);
        assert_eq!(summary.calls, 4);
        assert_eq!(summary.total_tokens, 182);
        assert_eq!(summary.by_tag["slide_conversation"].count, 2);
        assert_eq!(summary.by_tag["slide_conversation"].tokens, 30);
        assert_eq!(summary.by_tag["other"].label, "Miscellaneous");
        assert!(summary.total_cost > 0.0);
    }
}
