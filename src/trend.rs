use crate::error::{AnalysisError, MetricResult};
use crate::schema::FinancialDataset;
use crate::stats;
use log::debug;
use serde::Serialize;

/// How many periods past the last observed month the fitted line is extended.
pub const FORECAST_PERIODS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Improving,
    Declining,
}

impl Trajectory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Improving => "improving",
            Trajectory::Declining => "declining",
        }
    }
}

/// One observed month of net cash flow, in chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyNetCashFlow {
    pub period: String,
    pub net_cash_flow: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendForecast {
    pub trend_slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub current_trajectory: Trajectory,
    pub monthly_data: Vec<MonthlyNetCashFlow>,
    /// Fitted line extended [`FORECAST_PERIODS`] months past the last bucket.
    pub forecast: Vec<f64>,
    /// Population standard deviation of the monthly series.
    pub volatility: f64,
    /// Absolute correlation between month index and net cash flow; zero with
    /// fewer than three buckets.
    pub trend_strength: f64,
}

/// Fits a linear trend to month-bucketed net cash flow and extends it six
/// periods. Requires a resolved date column and at least two monthly buckets.
pub fn analyze_trend(dataset: &FinancialDataset) -> MetricResult<TrendForecast> {
    if !dataset.resolved.date {
        return Err(AnalysisError::MissingDateSignal);
    }

    let buckets = dataset.monthly_buckets();
    if buckets.len() < 2 {
        return Err(AnalysisError::InsufficientHistory {
            months: buckets.len(),
        });
    }

    let series: Vec<f64> = buckets.iter().map(|b| b.net_cash_flow()).collect();
    let (slope, intercept) = stats::linear_regression(&series);
    let r_squared = stats::r_squared(&series, slope, intercept);

    let forecast: Vec<f64> = (series.len()..series.len() + FORECAST_PERIODS)
        .map(|i| slope * i as f64 + intercept)
        .collect();

    let trend_strength = if series.len() >= 3 {
        stats::index_correlation(&series).abs()
    } else {
        0.0
    };

    debug!(
        "Trend over {} months: slope {:.2}, r^2 {:.3}",
        series.len(),
        slope,
        r_squared
    );

    Ok(TrendForecast {
        trend_slope: slope,
        intercept,
        r_squared,
        current_trajectory: if slope > 0.0 {
            Trajectory::Improving
        } else {
            Trajectory::Declining
        },
        monthly_data: buckets
            .iter()
            .zip(&series)
            .map(|(bucket, net)| MonthlyNetCashFlow {
                period: bucket.label(),
                net_cash_flow: *net,
            })
            .collect(),
        forecast,
        volatility: stats::population_std_dev(&series),
        trend_strength,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{normalize_table, RawTable};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> RawTable {
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        RawTable::new(columns, rows)
    }

    fn monthly_net(values: &[f64]) -> RawTable {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                vec![
                    json!(format!("2024-{:02}-15", i + 1)),
                    json!(v.to_string()),
                    json!("0"),
                ]
            })
            .collect();
        table(&["date", "income", "expenses"], rows)
    }

    #[test]
    fn test_requires_date_column() {
        let t = table(&["income", "expenses"], vec![vec![json!("10"), json!("5")]]);
        let result = analyze_trend(&normalize_table(&t));
        assert!(matches!(result, Err(AnalysisError::MissingDateSignal)));
    }

    #[test]
    fn test_single_month_is_insufficient_history() {
        let t = table(
            &["date", "income", "expenses"],
            vec![
                vec![json!("2024-01-01"), json!("5000"), json!("0")],
                vec![json!("2024-01-28"), json!("0"), json!("1200")],
            ],
        );
        let result = analyze_trend(&normalize_table(&t));
        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientHistory { months: 1 })
        ));
    }

    #[test]
    fn test_linear_series_recovers_slope_and_forecast() {
        // Net cash flow 100, 200, 300, 400 across four months.
        let t = monthly_net(&[100.0, 200.0, 300.0, 400.0]);
        let trend = analyze_trend(&normalize_table(&t)).unwrap();

        assert!((trend.trend_slope - 100.0).abs() < 1e-9);
        assert!((trend.intercept - 100.0).abs() < 1e-9);
        assert!((trend.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(trend.current_trajectory, Trajectory::Improving);
        assert_eq!(trend.forecast.len(), FORECAST_PERIODS);
        assert!((trend.forecast[0] - 500.0).abs() < 1e-9);
        assert!((trend.forecast[5] - 1000.0).abs() < 1e-9);
        assert!((trend.trend_strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_declining_series() {
        let t = monthly_net(&[400.0, 300.0, 200.0]);
        let trend = analyze_trend(&normalize_table(&t)).unwrap();
        assert!(trend.trend_slope < 0.0);
        assert_eq!(trend.current_trajectory, Trajectory::Declining);
    }

    #[test]
    fn test_trend_strength_zero_for_two_buckets() {
        let t = monthly_net(&[100.0, 200.0]);
        let trend = analyze_trend(&normalize_table(&t)).unwrap();
        assert_eq!(trend.trend_strength, 0.0);
        assert_eq!(trend.monthly_data.len(), 2);
        assert_eq!(trend.monthly_data[0].period, "2024-01");
    }

    #[test]
    fn test_volatility_is_population_std_dev() {
        let t = monthly_net(&[100.0, 300.0]);
        let trend = analyze_trend(&normalize_table(&t)).unwrap();
        assert!((trend.volatility - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_amount_only_series_uses_raw_sums() {
        let t = table(
            &["date", "amount"],
            vec![
                vec![json!("2024-01-05"), json!("100")],
                vec![json!("2024-01-25"), json!("50")],
                vec![json!("2024-02-05"), json!("250")],
            ],
        );
        let trend = analyze_trend(&normalize_table(&t)).unwrap();
        assert_eq!(trend.monthly_data.len(), 2);
        assert!((trend.monthly_data[0].net_cash_flow - 150.0).abs() < 1e-9);
        assert!((trend.monthly_data[1].net_cash_flow - 250.0).abs() < 1e-9);
    }
}
