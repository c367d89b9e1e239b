use crate::cash_flow::CashFlowSummary;
use crate::error::MetricResult;
use crate::profitability::ProfitabilitySummary;
use crate::stats;
use crate::trend::TrendForecast;
use serde::Serialize;

/// Weighted 0-100 composite of cash-flow, profitability, trend, and
/// volatility signals, with a letter grade and a textual assessment.
#[derive(Debug, Clone, Serialize)]
pub struct HealthScore {
    pub score: u32,
    pub grade: &'static str,
    pub assessment: &'static str,
}

/// Scores the dataset from already-computed metric results. Each sub-metric
/// is consulted defensively: an errored section contributes zero points and
/// never aborts scoring.
pub fn score_financial_health(
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    trend: &MetricResult<TrendForecast>,
) -> HealthScore {
    let mut score: u32 = 0;

    if let Ok(cf) = cash_flow {
        if cf.net_cash_flow > 0.0 {
            score += 20;
            if cf.cash_flow_ratio > 1.2 {
                score += 10;
            }
        }
    }

    if let Ok(prof) = profitability {
        let margin = prof.gross_profit_margin;
        if margin > 0.30 {
            score += 30;
        } else if margin > 0.15 {
            score += 20;
        } else if margin > 0.05 {
            score += 10;
        }
    }

    if let Ok(t) = trend {
        if t.trend_slope > 0.0 {
            score += 15;
            if t.r_squared > 0.7 {
                score += 10;
            }
        }

        let flow_scale = cash_flow
            .as_ref()
            .map(|cf| stats::mean(&[cf.total_income.abs(), cf.total_expenses.abs()]))
            .unwrap_or(0.0);
        if t.volatility < flow_scale * 0.1 {
            score += 15;
        } else if t.volatility < flow_scale * 0.2 {
            score += 10;
        }
    }

    let score = score.min(100);
    HealthScore {
        score,
        grade: grade_for(score),
        assessment: assessment_for(score),
    }
}

fn grade_for(score: u32) -> &'static str {
    match score {
        90..=u32::MAX => "A+",
        80..=89 => "A",
        70..=79 => "B",
        60..=69 => "C",
        50..=59 => "D",
        _ => "F",
    }
}

fn assessment_for(score: u32) -> &'static str {
    if score >= 80 {
        "Excellent financial health with strong performance indicators"
    } else if score >= 60 {
        "Good financial health with some areas for improvement"
    } else if score >= 40 {
        "Moderate financial health requiring attention to key areas"
    } else {
        "Poor financial health requiring immediate action"
    }
}
