//! Table-driven rule sets turning metric values into insights,
//! recommendations, and alerts.
//!
//! Each rule set is a fixed, ordered slice of predicate/render pairs
//! evaluated top to bottom with no short-circuiting: every matching rule
//! contributes its output, and insertion order carries priority end to end.

pub mod alerts;
pub mod insights;
pub mod recommendations;

pub use alerts::{create_alerts, Alert, AlertReport, Impact, OverallRisk, SeveritySummary, Urgency};
pub use insights::{generate_insights, GrowthOpportunity, InsightBundle, RiskAssessment, RiskLevel};
pub use recommendations::{generate_recommendations, BusinessSize, RecommendationPlan};

use crate::cash_flow::CashFlowSummary;
use crate::profitability::ProfitabilitySummary;
use crate::trend::TrendForecast;

/// One entry of a rule table: a predicate over the context and a renderer
/// producing the matching message.
pub(crate) struct Rule<T> {
    pub when: fn(&T) -> bool,
    pub render: fn(&T) -> String,
}

pub(crate) fn evaluate<T>(rules: &[Rule<T>], context: &T) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| (rule.when)(context))
        .map(|rule| (rule.render)(context))
        .collect()
}

/// Borrowed view over whichever metric sections were produced. Rules read
/// through this so an errored section simply never matches.
#[derive(Clone, Copy)]
pub struct MetricsView<'a> {
    pub cash_flow: Option<&'a CashFlowSummary>,
    pub profitability: Option<&'a ProfitabilitySummary>,
    pub trend: Option<&'a TrendForecast>,
}

/// "$1,234.56" style formatting; the sign stays in front of the symbol.
pub(crate) fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let formatted = format!("{:.2}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${grouped}.{fraction}")
    } else {
        format!("${grouped}.{fraction}")
    }
}

/// "12.3%" style formatting of a ratio.
pub(crate) fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
