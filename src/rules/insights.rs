use super::{evaluate, format_currency, format_percent, MetricsView, Rule};
use crate::cash_flow::CashFlowSummary;
use crate::error::MetricResult;
use crate::health::HealthScore;
use crate::profitability::ProfitabilitySummary;
use crate::stats;
use crate::trend::TrendForecast;
use serde::Serialize;

const NO_CASH_FLOW_DATA: &str = "Unable to analyze cash flow - insufficient data";
const NO_PROFITABILITY_DATA: &str = "Unable to analyze profitability - insufficient data";
const NO_TREND_DATA: &str = "Unable to analyze trends - insufficient historical data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub kind: &'static str,
    pub level: RiskLevel,
    pub description: &'static str,
    pub mitigation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthOpportunity {
    pub kind: &'static str,
    pub description: String,
    pub potential: &'static str,
    pub timeline: &'static str,
}

/// Narrative restatement of the metric results, with risk and opportunity
/// classifications. Every list preserves rule-table order.
#[derive(Debug, Clone, Serialize)]
pub struct InsightBundle {
    pub cash_flow_insights: Vec<String>,
    pub profitability_insights: Vec<String>,
    pub trend_insights: Vec<String>,
    pub health_insights: Vec<String>,
    pub risk_assessment: Vec<RiskAssessment>,
    pub growth_opportunities: Vec<GrowthOpportunity>,
}

const CASH_FLOW_RULES: &[Rule<CashFlowSummary>] = &[
    Rule {
        when: |cf| cf.net_cash_flow > 0.0,
        render: |cf| {
            format!(
                "Positive cash flow of {} indicates healthy financial operations",
                format_currency(cf.net_cash_flow)
            )
        },
    },
    Rule {
        when: |cf| cf.net_cash_flow > 0.0 && cf.cash_flow_ratio > 1.5,
        render: |cf| {
            format!(
                "Excellent cash flow ratio of {:.2} shows strong financial stability",
                cf.cash_flow_ratio
            )
        },
    },
    Rule {
        when: |cf| cf.net_cash_flow <= 0.0,
        render: |cf| {
            format!(
                "Negative cash flow of {} requires immediate attention",
                format_currency(cf.net_cash_flow)
            )
        },
    },
    Rule {
        when: |cf| cf.net_cash_flow <= 0.0,
        render: |_| {
            "Consider implementing stricter credit terms and faster collection processes"
                .to_string()
        },
    },
    Rule {
        when: |cf| cf.total_income > 0.0 && cf.total_expenses > 0.0 && cf.expense_ratio > 0.9,
        render: |cf| {
            format!(
                "High expense ratio of {} - costs are consuming most of your income",
                format_percent(cf.expense_ratio)
            )
        },
    },
    Rule {
        when: |cf| cf.total_income > 0.0 && cf.total_expenses > 0.0 && cf.expense_ratio < 0.7,
        render: |cf| {
            format!(
                "Healthy expense ratio of {} shows good cost management",
                format_percent(cf.expense_ratio)
            )
        },
    },
    Rule {
        when: |cf| cf.monthly_average > 0.0,
        render: |cf| {
            format!(
                "Average monthly cash flow of {} shows consistent performance",
                format_currency(cf.monthly_average)
            )
        },
    },
    Rule {
        when: |cf| cf.monthly_average < 0.0,
        render: |cf| {
            format!(
                "Average monthly cash flow of {} indicates structural issues",
                format_currency(cf.monthly_average)
            )
        },
    },
];

const PROFITABILITY_RULES: &[Rule<ProfitabilitySummary>] = &[
    Rule {
        when: |p| p.gross_profit_margin > 0.4,
        render: |p| {
            format!(
                "Exceptional profit margin of {} - you're operating very efficiently",
                format_percent(p.gross_profit_margin)
            )
        },
    },
    Rule {
        when: |p| p.gross_profit_margin > 0.2 && p.gross_profit_margin <= 0.4,
        render: |p| {
            format!(
                "Strong profit margin of {} - good pricing and cost control",
                format_percent(p.gross_profit_margin)
            )
        },
    },
    Rule {
        when: |p| p.gross_profit_margin > 0.1 && p.gross_profit_margin <= 0.2,
        render: |p| {
            format!(
                "Moderate profit margin of {} - room for improvement",
                format_percent(p.gross_profit_margin)
            )
        },
    },
    Rule {
        when: |p| p.gross_profit_margin > 0.0 && p.gross_profit_margin <= 0.1,
        render: |p| {
            format!(
                "Low profit margin of {} - urgent optimization needed",
                format_percent(p.gross_profit_margin)
            )
        },
    },
    Rule {
        when: |p| p.gross_profit_margin <= 0.0,
        render: |p| {
            format!(
                "Operating at a loss with {} margin - immediate action required",
                format_percent(p.gross_profit_margin)
            )
        },
    },
    Rule {
        when: |p| p.revenue > 0.0,
        render: |p| {
            format!(
                "Total revenue of {} with gross profit of {}",
                format_currency(p.revenue),
                format_currency(p.gross_profit)
            )
        },
    },
    Rule {
        when: |p| {
            p.break_even
                .as_ref()
                .map(|be| be.current_transactions as f64 > be.break_even_transactions)
                .unwrap_or(false)
        },
        render: |p| match &p.break_even {
            Ok(be) => format!(
                "Operating {:.0} transactions above break-even point",
                be.current_transactions as f64 - be.break_even_transactions
            ),
            Err(_) => String::new(),
        },
    },
    Rule {
        when: |p| {
            p.break_even
                .as_ref()
                .map(|be| be.current_transactions as f64 <= be.break_even_transactions)
                .unwrap_or(false)
        },
        render: |p| match &p.break_even {
            Ok(be) => format!(
                "Need {:.0} more transactions to reach break-even",
                be.break_even_transactions - be.current_transactions as f64
            ),
            Err(_) => String::new(),
        },
    },
];

const TREND_RULES: &[Rule<TrendForecast>] = &[
    Rule {
        when: |t| t.trend_slope > 0.0,
        render: |t| {
            format!(
                "Cash flow is trending upward with growth of {} per period",
                format_currency(t.trend_slope)
            )
        },
    },
    Rule {
        when: |t| t.trend_slope > 0.0 && t.r_squared > 0.7,
        render: |t| {
            format!(
                "Strong trend reliability ({} confidence) suggests sustainable growth",
                format_percent(t.r_squared)
            )
        },
    },
    Rule {
        when: |t| t.trend_slope <= 0.0,
        render: |t| {
            format!(
                "Cash flow is declining by {} per period",
                format_currency(t.trend_slope.abs())
            )
        },
    },
    Rule {
        when: |t| t.trend_slope <= 0.0,
        render: |_| "Investigate underlying causes and implement corrective measures".to_string(),
    },
    Rule {
        when: |t| t.volatility > 0.0 && t.volatility < 1000.0,
        render: |_| "Low volatility indicates stable and predictable cash flows".to_string(),
    },
    Rule {
        when: |t| t.volatility > 5000.0,
        render: |_| {
            "High volatility suggests unpredictable cash flows - consider stabilization strategies"
                .to_string()
        },
    },
    Rule {
        when: |t| !t.forecast.is_empty() && stats::mean(&t.forecast) > 0.0,
        render: |t| {
            format!(
                "6-month forecast shows average monthly cash flow of {}",
                format_currency(stats::mean(&t.forecast))
            )
        },
    },
    Rule {
        when: |t| !t.forecast.is_empty() && stats::mean(&t.forecast) <= 0.0,
        render: |_| "Forecast indicates potential cash flow challenges ahead".to_string(),
    },
];

const HEALTH_RULES: &[Rule<HealthScore>] = &[
    Rule {
        when: |h| h.score >= 90,
        render: |h| {
            format!(
                "Excellent financial health score of {}/100 (Grade: {})",
                h.score, h.grade
            )
        },
    },
    Rule {
        when: |h| h.score >= 90,
        render: |_| "Your business demonstrates exceptional financial management".to_string(),
    },
    Rule {
        when: |h| (70..90).contains(&h.score),
        render: |h| {
            format!(
                "Good financial health score of {}/100 (Grade: {})",
                h.score, h.grade
            )
        },
    },
    Rule {
        when: |h| (70..90).contains(&h.score),
        render: |_| "Strong financial foundation with minor areas for improvement".to_string(),
    },
    Rule {
        when: |h| (50..70).contains(&h.score),
        render: |h| {
            format!(
                "Moderate financial health score of {}/100 (Grade: {})",
                h.score, h.grade
            )
        },
    },
    Rule {
        when: |h| (50..70).contains(&h.score),
        render: |_| "Several opportunities to strengthen your financial position".to_string(),
    },
    Rule {
        when: |h| h.score < 50,
        render: |h| {
            format!(
                "Poor financial health score of {}/100 (Grade: {})",
                h.score, h.grade
            )
        },
    },
    Rule {
        when: |h| h.score < 50,
        render: |_| "Immediate action needed to improve financial stability".to_string(),
    },
    Rule {
        when: |_| true,
        render: |h| format!("Assessment: {}", h.assessment),
    },
];

struct RiskRule {
    when: fn(&MetricsView) -> bool,
    build: fn(&MetricsView) -> RiskAssessment,
}

const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        when: |m| m.cash_flow.map(|cf| cf.net_cash_flow < 0.0).unwrap_or(false),
        build: |m| {
            let net = m.cash_flow.map(|cf| cf.net_cash_flow).unwrap_or(0.0);
            RiskAssessment {
                kind: "liquidity",
                level: if net < -5000.0 {
                    RiskLevel::High
                } else {
                    RiskLevel::Medium
                },
                description: "Negative cash flow indicates immediate liquidity concerns",
                mitigation: "Accelerate receivables, delay payables, secure credit line",
            }
        },
    },
    RiskRule {
        when: |m| {
            m.profitability
                .map(|p| p.gross_profit_margin < 0.05)
                .unwrap_or(false)
        },
        build: |_| RiskAssessment {
            kind: "profitability",
            level: RiskLevel::High,
            description: "Low profit margins threaten long-term sustainability",
            mitigation: "Review pricing strategy, optimize operations, reduce costs",
        },
    },
    RiskRule {
        when: |m| m.trend.map(|t| t.trend_slope < 0.0).unwrap_or(false),
        build: |_| RiskAssessment {
            kind: "trend",
            level: RiskLevel::Medium,
            description: "Declining cash flow trend indicates potential future problems",
            mitigation: "Identify root causes, develop growth strategy, monitor closely",
        },
    },
    RiskRule {
        when: |m| m.trend.map(|t| t.volatility > 5000.0).unwrap_or(false),
        build: |_| RiskAssessment {
            kind: "volatility",
            level: RiskLevel::Medium,
            description: "High cash flow volatility makes planning difficult",
            mitigation: "Diversify revenue streams, implement better forecasting",
        },
    },
];

struct OpportunityRule {
    when: fn(&MetricsView) -> bool,
    build: fn(&MetricsView) -> GrowthOpportunity,
}

const OPPORTUNITY_RULES: &[OpportunityRule] = &[
    OpportunityRule {
        when: |m| {
            m.cash_flow
                .map(|cf| cf.net_cash_flow > 10_000.0)
                .unwrap_or(false)
        },
        build: |m| {
            let net = m.cash_flow.map(|cf| cf.net_cash_flow).unwrap_or(0.0);
            GrowthOpportunity {
                kind: "investment",
                description: format!(
                    "Strong cash position of {} enables growth investments",
                    format_currency(net)
                ),
                potential: "Invest in marketing, equipment, or expansion",
                timeline: "1-3 months",
            }
        },
    },
    OpportunityRule {
        when: |m| {
            m.profitability
                .map(|p| p.gross_profit_margin > 0.1 && p.gross_profit_margin < 0.3)
                .unwrap_or(false)
        },
        build: |_| GrowthOpportunity {
            kind: "margin_improvement",
            description: "Moderate margins suggest room for optimization".to_string(),
            potential: "Implement value-based pricing, reduce costs",
            timeline: "2-6 months",
        },
    },
    OpportunityRule {
        when: |m| {
            let improving = m.trend.map(|t| t.trend_slope > 0.0).unwrap_or(false);
            let strong_margin = m
                .profitability
                .map(|p| p.gross_profit_margin > 0.2)
                .unwrap_or(false);
            improving && strong_margin
        },
        build: |_| GrowthOpportunity {
            kind: "expansion",
            description: "Strong trends and margins indicate readiness for growth".to_string(),
            potential: "Scale operations, enter new markets, hire staff",
            timeline: "3-12 months",
        },
    },
    OpportunityRule {
        when: |m| m.cash_flow.map(|cf| cf.expense_ratio > 0.8).unwrap_or(false),
        build: |_| GrowthOpportunity {
            kind: "efficiency",
            description: "High expense ratio suggests automation/optimization potential"
                .to_string(),
            potential: "Automate processes, renegotiate contracts, outsource",
            timeline: "1-6 months",
        },
    },
];

/// Evaluates the insight rule tables over whichever metric sections were
/// produced. Sections without data contribute a fixed placeholder line.
pub fn generate_insights(
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    trend: &MetricResult<TrendForecast>,
    health: &HealthScore,
) -> InsightBundle {
    let view = MetricsView {
        cash_flow: cash_flow.as_ref().ok(),
        profitability: profitability.as_ref().ok(),
        trend: trend.as_ref().ok(),
    };

    InsightBundle {
        cash_flow_insights: match view.cash_flow {
            Some(cf) => evaluate(CASH_FLOW_RULES, cf),
            None => vec![NO_CASH_FLOW_DATA.to_string()],
        },
        profitability_insights: match view.profitability {
            Some(p) => evaluate(PROFITABILITY_RULES, p),
            None => vec![NO_PROFITABILITY_DATA.to_string()],
        },
        trend_insights: match view.trend {
            Some(t) => evaluate(TREND_RULES, t),
            None => vec![NO_TREND_DATA.to_string()],
        },
        health_insights: evaluate(HEALTH_RULES, health),
        risk_assessment: RISK_RULES
            .iter()
            .filter(|rule| (rule.when)(&view))
            .map(|rule| (rule.build)(&view))
            .collect(),
        growth_opportunities: OPPORTUNITY_RULES
            .iter()
            .filter(|rule| (rule.when)(&view))
            .map(|rule| (rule.build)(&view))
            .collect(),
    }
}
