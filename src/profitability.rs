use crate::error::{AnalysisError, MetricResult};
use crate::schema::{CategoryMask, FinancialDataset};
use crate::stats;
use log::debug;
use serde::Serialize;

/// Break-even estimate derived from expense patterns. Fixed costs are the
/// 10th percentile of the expense column, a heuristic proxy rather than an
/// accounting derivation.
#[derive(Debug, Clone, Serialize)]
pub struct BreakEvenAnalysis {
    pub fixed_costs: f64,
    pub variable_cost_ratio: f64,
    pub contribution_margin: f64,
    pub break_even_transactions: f64,
    pub break_even_revenue: f64,
    pub current_transactions: usize,
    pub margin_of_safety: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilitySummary {
    pub revenue: f64,
    pub costs: f64,
    pub gross_profit: f64,
    pub gross_profit_margin: f64,
    pub profit_per_transaction: f64,
    #[serde(with = "crate::error::metric_section")]
    pub break_even: MetricResult<BreakEvenAnalysis>,
    /// OLS slope of the monthly profit margin; zero with under two months.
    pub margin_trend_slope: f64,
}

fn total_revenue(dataset: &FinancialDataset) -> f64 {
    let resolved = &dataset.resolved;
    if resolved.revenue {
        return dataset.records.iter().filter_map(|r| r.revenue).sum();
    }
    if resolved.income {
        return dataset.records.iter().filter_map(|r| r.income).sum();
    }
    if resolved.amount && resolved.category {
        return masked_amount_sum(dataset, CategoryMask::INCOME);
    }
    0.0
}

fn total_costs(dataset: &FinancialDataset) -> f64 {
    let resolved = &dataset.resolved;
    if resolved.costs {
        return dataset.records.iter().filter_map(|r| r.costs).sum();
    }
    if resolved.expenses {
        return dataset.records.iter().filter_map(|r| r.expenses).sum();
    }
    if resolved.amount && resolved.category {
        return masked_amount_sum(dataset, CategoryMask::EXPENSE);
    }
    0.0
}

fn masked_amount_sum(dataset: &FinancialDataset, mask: CategoryMask) -> f64 {
    dataset
        .records
        .iter()
        .filter_map(|r| match (r.amount, r.category.as_deref()) {
            (Some(amount), Some(category)) if mask.matches(category) => Some(amount),
            _ => None,
        })
        .sum()
}

/// Computes the profitability summary. Fails when no positive revenue signal
/// can be resolved through any fallback chain.
pub fn analyze_profitability(dataset: &FinancialDataset) -> MetricResult<ProfitabilitySummary> {
    let revenue = total_revenue(dataset);
    if revenue <= 0.0 {
        return Err(AnalysisError::MissingFinancialSignal);
    }
    let costs = total_costs(dataset);
    let gross_profit = revenue - costs;
    let row_count = dataset.len();

    debug!(
        "Profitability: revenue {:.2}, costs {:.2}, gross profit {:.2}",
        revenue, costs, gross_profit
    );

    Ok(ProfitabilitySummary {
        revenue,
        costs,
        gross_profit,
        gross_profit_margin: gross_profit / revenue,
        profit_per_transaction: if row_count > 0 {
            gross_profit / row_count as f64
        } else {
            0.0
        },
        break_even: break_even_analysis(dataset, revenue, costs),
        margin_trend_slope: margin_trend_slope(dataset),
    })
}

fn break_even_analysis(
    dataset: &FinancialDataset,
    revenue: f64,
    costs: f64,
) -> MetricResult<BreakEvenAnalysis> {
    let fixed_costs = estimate_fixed_costs(dataset);
    let variable_cost_ratio = if revenue > 0.0 { costs / revenue } else { 0.0 };
    let row_count = dataset.len();
    let avg_revenue_per_transaction = if row_count > 0 {
        revenue / row_count as f64
    } else {
        0.0
    };

    if variable_cost_ratio >= 1.0 || avg_revenue_per_transaction <= 0.0 {
        return Err(AnalysisError::InsufficientSignal(
            "break-even analysis".to_string(),
        ));
    }

    let contribution_margin = avg_revenue_per_transaction * (1.0 - variable_cost_ratio);
    let break_even_transactions = if contribution_margin > 0.0 {
        fixed_costs / contribution_margin
    } else {
        f64::INFINITY
    };
    let margin_of_safety = if break_even_transactions.is_finite() {
        row_count as f64 - break_even_transactions
    } else {
        0.0
    };

    Ok(BreakEvenAnalysis {
        fixed_costs,
        variable_cost_ratio,
        contribution_margin,
        break_even_transactions,
        break_even_revenue: break_even_transactions * avg_revenue_per_transaction,
        current_transactions: row_count,
        margin_of_safety,
    })
}

/// Bottom decile of observed expenses stands in for the fixed-cost base.
fn estimate_fixed_costs(dataset: &FinancialDataset) -> f64 {
    if !dataset.resolved.expenses {
        return 0.0;
    }
    let expenses: Vec<f64> = dataset.records.iter().filter_map(|r| r.expenses).collect();
    stats::percentile(&expenses, 0.1)
}

fn margin_trend_slope(dataset: &FinancialDataset) -> f64 {
    if !dataset.resolved.date {
        return 0.0;
    }
    let buckets = dataset.monthly_buckets();
    if buckets.len() < 2 {
        return 0.0;
    }

    let margins: Vec<f64> = buckets
        .iter()
        .map(|bucket| {
            let income = bucket.income.unwrap_or(0.0);
            let expenses = bucket.expenses.unwrap_or(0.0);
            if income != 0.0 {
                (income - expenses) / income
            } else {
                0.0
            }
        })
        .collect();

    let (slope, _) = stats::linear_regression(&margins);
    slope
}
