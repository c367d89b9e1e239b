use crate::error::{AnalysisError, MetricResult};
use crate::schema::{CategoryMask, FinancialDataset};
use crate::stats;
use chrono::Datelike;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Cash-flow totals and derived ratios for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct CashFlowSummary {
    pub net_cash_flow: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    /// Income over expenses; `+inf` when expenses are zero but income flows.
    pub cash_flow_ratio: f64,
    /// Expenses over income; zero when there is no income.
    pub expense_ratio: f64,
    /// Mean of month-bucketed net cash flow; zero without a date column.
    pub monthly_average: f64,
    /// Mean amount per calendar month (1-12); empty when fewer than 12 rows
    /// or no date column.
    pub seasonal_analysis: BTreeMap<u32, f64>,
}

/// Sums income and expenses using the first applicable strategy: direct
/// income/expense columns, else category-masked amounts.
fn income_expense_totals(dataset: &FinancialDataset) -> MetricResult<(f64, f64)> {
    let resolved = &dataset.resolved;

    if resolved.income && resolved.expenses {
        let total_income: f64 = dataset
            .records
            .iter()
            .filter_map(|r| r.income)
            .sum();
        let total_expenses: f64 = dataset
            .records
            .iter()
            .filter_map(|r| r.expenses)
            .sum();
        return Ok((total_income, total_expenses));
    }

    if resolved.amount && resolved.category {
        let mut total_income = 0.0;
        let mut total_expenses = 0.0;
        for record in &dataset.records {
            let (Some(amount), Some(category)) = (record.amount, record.category.as_deref())
            else {
                continue;
            };
            if CategoryMask::INCOME.matches(category) {
                total_income += amount;
            }
            if CategoryMask::EXPENSE.matches(category) {
                total_expenses += amount;
            }
        }
        return Ok((total_income, total_expenses));
    }

    Err(AnalysisError::MissingFinancialSignal)
}

/// Computes the cash-flow summary, or fails when neither the income/expense
/// columns nor an amount/category pair resolved.
pub fn analyze_cash_flow(dataset: &FinancialDataset) -> MetricResult<CashFlowSummary> {
    let (total_income, total_expenses) = income_expense_totals(dataset)?;
    let net_cash_flow = total_income - total_expenses;

    let cash_flow_ratio = if total_expenses > 0.0 {
        total_income / total_expenses
    } else if total_income > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let expense_ratio = if total_income > 0.0 {
        total_expenses / total_income
    } else {
        0.0
    };

    debug!(
        "Cash flow: income {:.2}, expenses {:.2}, net {:.2}",
        total_income, total_expenses, net_cash_flow
    );

    Ok(CashFlowSummary {
        net_cash_flow,
        total_income,
        total_expenses,
        cash_flow_ratio,
        expense_ratio,
        monthly_average: monthly_average(dataset),
        seasonal_analysis: seasonal_analysis(dataset),
    })
}

fn monthly_average(dataset: &FinancialDataset) -> f64 {
    if !dataset.resolved.date {
        return 0.0;
    }
    let series: Vec<f64> = dataset
        .monthly_buckets()
        .iter()
        .map(|b| b.net_cash_flow())
        .collect();
    stats::mean(&series)
}

/// Mean amount grouped by calendar month. Needs at least a year's worth of
/// rows to say anything about seasonality.
fn seasonal_analysis(dataset: &FinancialDataset) -> BTreeMap<u32, f64> {
    let mut patterns = BTreeMap::new();
    if !dataset.resolved.date || !dataset.resolved.amount || dataset.len() < 12 {
        return patterns;
    }

    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for record in &dataset.records {
        let (Some(date), Some(amount)) = (record.date, record.amount) else {
            continue;
        };
        let entry = sums.entry(date.month()).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    for (month, (sum, count)) in sums {
        if count > 0 {
            patterns.insert(month, sum / count as f64);
        }
    }
    patterns
}
