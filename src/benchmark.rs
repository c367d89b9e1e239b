use crate::cash_flow::CashFlowSummary;
use crate::error::MetricResult;
use crate::profitability::ProfitabilitySummary;
use serde::Serialize;

/// Data-contract version of the static benchmark table. Any change to the
/// ratios below is a contract change, not runtime configuration.
pub const BENCHMARK_TABLE_VERSION: &str = "2024.1";

/// Reference ratios for one industry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkRatios {
    pub profit_margin: f64,
    pub cash_flow_ratio: f64,
    pub expense_ratio: f64,
}

/// Looks up an industry's reference ratios; unknown codes fall back to the
/// `default` entry, which always exists.
pub fn industry_benchmarks(industry: &str) -> BenchmarkRatios {
    match industry {
        "retail" => BenchmarkRatios {
            profit_margin: 0.05,
            cash_flow_ratio: 1.15,
            expense_ratio: 0.85,
        },
        "services" => BenchmarkRatios {
            profit_margin: 0.15,
            cash_flow_ratio: 1.25,
            expense_ratio: 0.75,
        },
        "manufacturing" => BenchmarkRatios {
            profit_margin: 0.08,
            cash_flow_ratio: 1.20,
            expense_ratio: 0.80,
        },
        "technology" => BenchmarkRatios {
            profit_margin: 0.25,
            cash_flow_ratio: 1.40,
            expense_ratio: 0.65,
        },
        "consulting" => BenchmarkRatios {
            profit_margin: 0.20,
            cash_flow_ratio: 1.30,
            expense_ratio: 0.70,
        },
        _ => BenchmarkRatios {
            profit_margin: 0.10,
            cash_flow_ratio: 1.20,
            expense_ratio: 0.80,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativePerformance {
    Above,
    Below,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkComparison {
    pub your_performance: f64,
    pub industry_benchmark: f64,
    pub difference: f64,
    pub performance: RelativePerformance,
    pub percentile: u32,
}

/// Per-industry comparison of the computed ratios. A comparison is only
/// present when the metric it reads from was produced.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub industry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<BenchmarkComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_ratio: Option<BenchmarkComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_ratio: Option<BenchmarkComparison>,
}

fn comparison(yours: f64, benchmark: f64, difference: f64, steps: [f64; 3]) -> BenchmarkComparison {
    let percentile = if difference > steps[0] {
        90
    } else if difference > steps[1] {
        75
    } else if difference > steps[2] {
        50
    } else {
        25
    };

    BenchmarkComparison {
        your_performance: yours,
        industry_benchmark: benchmark,
        difference,
        performance: if difference > 0.0 {
            RelativePerformance::Above
        } else {
            RelativePerformance::Below
        },
        percentile,
    }
}

/// Compares computed metrics against the industry's reference ratios.
/// Expense ratio is inverted before comparison since lower is better.
pub fn compare_to_industry(
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    industry: &str,
) -> BenchmarkReport {
    let benchmarks = industry_benchmarks(industry);

    let profit_margin = profitability.as_ref().ok().map(|prof| {
        let diff = prof.gross_profit_margin - benchmarks.profit_margin;
        comparison(
            prof.gross_profit_margin,
            benchmarks.profit_margin,
            diff,
            [0.05, 0.02, -0.02],
        )
    });

    let cash_flow_ratio = cash_flow.as_ref().ok().map(|cf| {
        let diff = cf.cash_flow_ratio - benchmarks.cash_flow_ratio;
        comparison(
            cf.cash_flow_ratio,
            benchmarks.cash_flow_ratio,
            diff,
            [0.2, 0.1, -0.1],
        )
    });

    let expense_ratio = cash_flow.as_ref().ok().map(|cf| {
        let diff = benchmarks.expense_ratio - cf.expense_ratio;
        comparison(
            cf.expense_ratio,
            benchmarks.expense_ratio,
            diff,
            [0.1, 0.05, -0.05],
        )
    });

    BenchmarkReport {
        industry: industry.to_string(),
        profit_margin,
        cash_flow_ratio,
        expense_ratio,
    }
}
