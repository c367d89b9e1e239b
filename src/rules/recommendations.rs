use super::{format_percent, MetricsView};
use crate::benchmark::{BenchmarkReport, RelativePerformance};
use serde::{Deserialize, Serialize};

/// Caller-supplied business-size bucket; unknown codes fall back to small.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl BusinessSize {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "medium" => BusinessSize::Medium,
            "large" => BusinessSize::Large,
            _ => BusinessSize::Small,
        }
    }
}

/// Actionable recommendations grouped by horizon. Bucket contents keep the
/// rule-table order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecommendationPlan {
    pub immediate_actions: Vec<String>,
    pub short_term_strategies: Vec<String>,
    pub long_term_strategies: Vec<String>,
    pub strategic_recommendations: Vec<String>,
    pub cost_optimization: Vec<String>,
    pub revenue_enhancement: Vec<String>,
    pub risk_mitigation: Vec<String>,
}

#[derive(Clone, Copy)]
enum Bucket {
    Immediate,
    ShortTerm,
    LongTerm,
    Strategic,
    CostOptimization,
    RevenueEnhancement,
    RiskMitigation,
}

struct Context<'a> {
    metrics: MetricsView<'a>,
    benchmark: &'a BenchmarkReport,
    business_size: BusinessSize,
}

struct RecommendationRule {
    bucket: Bucket,
    when: fn(&Context) -> bool,
    render: fn(&Context) -> Vec<String>,
}

fn below_benchmark(section: &Option<crate::benchmark::BenchmarkComparison>) -> bool {
    section
        .as_ref()
        .map(|c| c.performance == RelativePerformance::Below)
        .unwrap_or(false)
}

const RULES: &[RecommendationRule] = &[
    RecommendationRule {
        bucket: Bucket::Immediate,
        when: |ctx| {
            ctx.metrics
                .cash_flow
                .map(|cf| cf.net_cash_flow < 0.0)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Immediately review and reduce non-essential expenses".to_string(),
                "Accelerate accounts receivable collection".to_string(),
                "Consider emergency financing options if cash position is critical".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::Immediate,
        when: |ctx| {
            ctx.metrics
                .profitability
                .map(|p| p.gross_profit_margin < 0.05)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Conduct urgent pricing analysis and consider price increases".to_string(),
                "Review and renegotiate supplier contracts".to_string(),
                "Identify and eliminate unprofitable products/services".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::ShortTerm,
        when: |ctx| {
            ctx.metrics
                .cash_flow
                .map(|cf| cf.cash_flow_ratio < 1.2)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Implement stricter payment terms for new customers".to_string(),
                "Optimize inventory levels to free up working capital".to_string(),
                "Explore factoring or invoice financing options".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::CostOptimization,
        when: |ctx| {
            ctx.metrics
                .cash_flow
                .map(|cf| cf.expense_ratio > 0.8)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Conduct comprehensive expense audit".to_string(),
                "Implement zero-based budgeting approach".to_string(),
                "Automate manual processes to reduce labor costs".to_string(),
                "Negotiate better rates with vendors and suppliers".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::RevenueEnhancement,
        when: |ctx| {
            ctx.metrics
                .profitability
                .map(|p| p.gross_profit_margin < 0.3)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Develop premium service offerings with higher margins".to_string(),
                "Implement value-based pricing strategies".to_string(),
                "Focus on customer retention to reduce acquisition costs".to_string(),
                "Explore cross-selling and upselling opportunities".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::Strategic,
        when: |ctx| below_benchmark(&ctx.benchmark.profit_margin),
        render: |ctx| {
            let shortfall = ctx
                .benchmark
                .profit_margin
                .as_ref()
                .map(|c| c.difference.abs())
                .unwrap_or(0.0);
            vec![format!(
                "Your profit margin is {} below industry average. \
                 Focus on operational efficiency and pricing optimization.",
                format_percent(shortfall)
            )]
        },
    },
    RecommendationRule {
        bucket: Bucket::Strategic,
        when: |ctx| below_benchmark(&ctx.benchmark.cash_flow_ratio),
        render: |_| {
            vec![
                "Your cash flow ratio is below industry standards. \
                 Improve working capital management and payment collection."
                    .to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::LongTerm,
        when: |ctx| {
            ctx.metrics
                .trend
                .map(|t| t.trend_slope < 0.0)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Develop new revenue streams to diversify income".to_string(),
                "Invest in customer acquisition and retention programs".to_string(),
                "Consider strategic partnerships or market expansion".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::Strategic,
        when: |ctx| ctx.business_size == BusinessSize::Small,
        render: |_| {
            vec![
                "Consider cloud-based financial management tools for better insights".to_string(),
                "Implement automated invoicing and payment systems".to_string(),
                "Focus on building strong customer relationships for organic growth".to_string(),
            ]
        },
    },
    RecommendationRule {
        bucket: Bucket::RiskMitigation,
        when: |ctx| {
            ctx.metrics
                .trend
                .map(|t| t.volatility > 5000.0)
                .unwrap_or(false)
        },
        render: |_| {
            vec![
                "Diversify revenue streams to reduce cash flow volatility".to_string(),
                "Implement rolling cash flow forecasting".to_string(),
            ]
        },
    },
];

/// Evaluates the recommendation rule table and groups the output by bucket.
pub fn generate_recommendations(
    metrics: MetricsView,
    benchmark: &BenchmarkReport,
    business_size: BusinessSize,
) -> RecommendationPlan {
    let context = Context {
        metrics,
        benchmark,
        business_size,
    };

    let mut plan = RecommendationPlan::default();
    for rule in RULES {
        if !(rule.when)(&context) {
            continue;
        }
        let lines = (rule.render)(&context);
        let bucket = match rule.bucket {
            Bucket::Immediate => &mut plan.immediate_actions,
            Bucket::ShortTerm => &mut plan.short_term_strategies,
            Bucket::LongTerm => &mut plan.long_term_strategies,
            Bucket::Strategic => &mut plan.strategic_recommendations,
            Bucket::CostOptimization => &mut plan.cost_optimization,
            Bucket::RevenueEnhancement => &mut plan.revenue_enhancement,
            Bucket::RiskMitigation => &mut plan.risk_mitigation,
        };
        bucket.extend(lines);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::compare_to_industry;
    use crate::cash_flow::CashFlowSummary;
    use crate::error::AnalysisError;
    use crate::profitability::ProfitabilitySummary;
    use crate::trend::{Trajectory, TrendForecast};
    use std::collections::BTreeMap;

    fn cash_flow(net: f64, ratio: f64, expense_ratio: f64) -> CashFlowSummary {
        CashFlowSummary {
            net_cash_flow: net,
            total_income: 10_000.0,
            total_expenses: 10_000.0 - net,
            cash_flow_ratio: ratio,
            expense_ratio,
            monthly_average: 0.0,
            seasonal_analysis: BTreeMap::new(),
        }
    }

    fn profitability(margin: f64) -> ProfitabilitySummary {
        ProfitabilitySummary {
            revenue: 10_000.0,
            costs: 10_000.0 * (1.0 - margin),
            gross_profit: 10_000.0 * margin,
            gross_profit_margin: margin,
            profit_per_transaction: 10.0,
            break_even: Err(AnalysisError::InsufficientSignal("break-even".into())),
            margin_trend_slope: 0.0,
        }
    }

    fn trend(slope: f64, volatility: f64) -> TrendForecast {
        TrendForecast {
            trend_slope: slope,
            intercept: 0.0,
            r_squared: 0.5,
            current_trajectory: if slope > 0.0 {
                Trajectory::Improving
            } else {
                Trajectory::Declining
            },
            monthly_data: Vec::new(),
            forecast: Vec::new(),
            volatility,
            trend_strength: 0.0,
        }
    }

    fn empty_benchmark() -> BenchmarkReport {
        compare_to_industry(
            &Err(AnalysisError::MissingFinancialSignal),
            &Err(AnalysisError::MissingFinancialSignal),
            "default",
        )
    }

    #[test]
    fn test_business_size_from_code() {
        assert_eq!(BusinessSize::from_code("small"), BusinessSize::Small);
        assert_eq!(BusinessSize::from_code("MEDIUM"), BusinessSize::Medium);
        assert_eq!(BusinessSize::from_code("large"), BusinessSize::Large);
        assert_eq!(BusinessSize::from_code("galactic"), BusinessSize::Small);
    }

    #[test]
    fn test_struggling_business_gets_immediate_actions() {
        let cf = cash_flow(-2_000.0, 0.8, 1.2);
        let prof = profitability(0.02);
        let view = MetricsView {
            cash_flow: Some(&cf),
            profitability: Some(&prof),
            trend: None,
        };
        let plan = generate_recommendations(view, &empty_benchmark(), BusinessSize::Medium);

        // Negative cash flow then low margin: 3 + 3 lines in table order.
        assert_eq!(plan.immediate_actions.len(), 6);
        assert!(plan.immediate_actions[0].contains("non-essential expenses"));
        assert!(plan.immediate_actions[3].contains("pricing analysis"));
        assert_eq!(plan.short_term_strategies.len(), 3);
        assert_eq!(plan.cost_optimization.len(), 4);
        assert_eq!(plan.revenue_enhancement.len(), 4);
        // Medium business: no small-business strategic block.
        assert!(plan.strategic_recommendations.is_empty());
    }

    #[test]
    fn test_healthy_business_gets_minimal_plan() {
        let cf = cash_flow(5_000.0, 2.0, 0.5);
        let prof = profitability(0.45);
        let t = trend(100.0, 500.0);
        let view = MetricsView {
            cash_flow: Some(&cf),
            profitability: Some(&prof),
            trend: Some(&t),
        };
        let plan = generate_recommendations(view, &empty_benchmark(), BusinessSize::Large);

        assert!(plan.immediate_actions.is_empty());
        assert!(plan.short_term_strategies.is_empty());
        assert!(plan.cost_optimization.is_empty());
        assert!(plan.revenue_enhancement.is_empty());
        assert!(plan.long_term_strategies.is_empty());
        assert!(plan.risk_mitigation.is_empty());
    }

    #[test]
    fn test_benchmark_shortfall_is_quantified() {
        let cf = cash_flow(1_000.0, 1.0, 0.9);
        let prof = profitability(0.02);
        let benchmark = compare_to_industry(
            &Ok(cash_flow(1_000.0, 1.0, 0.9)),
            &Ok(profitability(0.02)),
            "technology",
        );
        let view = MetricsView {
            cash_flow: Some(&cf),
            profitability: Some(&prof),
            trend: None,
        };
        let plan = generate_recommendations(view, &benchmark, BusinessSize::Small);

        // Margin 0.02 vs 0.25 benchmark: 23.0% shortfall.
        assert!(plan.strategic_recommendations[0].contains("23.0%"));
        assert!(plan.strategic_recommendations[1].contains("below industry standards"));
        // Small-business advice follows the benchmark lines.
        assert!(plan.strategic_recommendations[2].contains("cloud-based"));
        assert_eq!(plan.strategic_recommendations.len(), 5);
    }

    #[test]
    fn test_declining_trend_drives_long_term_strategies() {
        let t = trend(-100.0, 6_000.0);
        let view = MetricsView {
            cash_flow: None,
            profitability: None,
            trend: Some(&t),
        };
        let plan = generate_recommendations(view, &empty_benchmark(), BusinessSize::Medium);

        assert_eq!(plan.long_term_strategies.len(), 3);
        assert!(plan.long_term_strategies[0].contains("diversify income"));
        assert_eq!(plan.risk_mitigation.len(), 2);
        assert!(plan.risk_mitigation[0].contains("volatility"));
    }
}
