use crate::error::Result;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Headline metrics handed to a narrative generator. Kept deliberately
/// small: generators see conclusions, never raw rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeContext {
    pub net_cash_flow: Option<f64>,
    pub total_income: Option<f64>,
    pub total_expenses: Option<f64>,
    pub cash_flow_ratio: Option<f64>,
    pub gross_profit_margin: Option<f64>,
    pub trend_slope: Option<f64>,
    pub trajectory: Option<String>,
    pub health_score: u32,
    pub health_grade: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

/// Injected text-generation capability. The report pipeline must produce a
/// complete, correct report with only [`TemplateNarrative`]; richer
/// implementations may fail, and the assembler falls back rather than
/// propagating.
pub trait NarrativeGenerator {
    fn generate(&self, context: &NarrativeContext) -> Result<String>;
}

/// Deterministic fallback narrative built from fixed templates. Always
/// available and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrative;

impl NarrativeGenerator for TemplateNarrative {
    fn generate(&self, context: &NarrativeContext) -> Result<String> {
        let mut lines = Vec::new();

        lines.push(format!(
            "Overall financial health: {}/100 (Grade: {}).",
            context.health_score, context.health_grade
        ));

        if let Some(net) = context.net_cash_flow {
            let direction = if net >= 0.0 { "generated" } else { "consumed" };
            lines.push(format!(
                "The business {} a net cash flow of ${:.2} over the period.",
                direction,
                net.abs()
            ));
        }

        if let Some(margin) = context.gross_profit_margin {
            lines.push(format!(
                "Gross profit margin stands at {:.1}%.",
                margin * 100.0
            ));
        }

        if let (Some(slope), Some(trajectory)) = (context.trend_slope, &context.trajectory) {
            lines.push(format!(
                "Cash flow is {} at roughly ${:.2} per month.",
                trajectory,
                slope.abs()
            ));
        }

        if lines.len() == 1 {
            lines.push(
                "Not enough financial signal was found to summarize performance.".to_string(),
            );
        }

        Ok(lines.join(" "))
    }
}
