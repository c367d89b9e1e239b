use crate::error::Result;
use crate::report::AnalysisReport;
use serde::Serialize;

/// One row of the flattened key/value export.
#[derive(Debug, Clone, Serialize)]
pub struct FlatRow {
    pub metric: &'static str,
    /// Plain decimal or text rendering, parsable where numeric.
    pub value: String,
    pub status: String,
}

const NOT_AVAILABLE: &str = "N/A";

/// Serializes the full nested report to pretty-printed JSON.
pub fn to_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Flattens the headline metrics into key/value rows for tabular export.
/// Sections that failed render as "N/A" rather than being omitted.
pub fn to_flat_table(report: &AnalysisReport) -> Vec<FlatRow> {
    let mut rows = Vec::new();

    match &report.cash_flow {
        Ok(cf) => {
            rows.push(FlatRow {
                metric: "net_cash_flow",
                value: format!("{:.2}", cf.net_cash_flow),
                status: if cf.net_cash_flow > 0.0 {
                    "Positive".to_string()
                } else {
                    "Negative".to_string()
                },
            });
            rows.push(FlatRow {
                metric: "total_income",
                value: format!("{:.2}", cf.total_income),
                status: String::new(),
            });
            rows.push(FlatRow {
                metric: "total_expenses",
                value: format!("{:.2}", cf.total_expenses),
                status: String::new(),
            });
        }
        Err(err) => rows.push(FlatRow {
            metric: "net_cash_flow",
            value: NOT_AVAILABLE.to_string(),
            status: err.kind().to_string(),
        }),
    }

    match &report.profitability {
        Ok(prof) => rows.push(FlatRow {
            metric: "gross_profit_margin",
            value: format!("{:.4}", prof.gross_profit_margin),
            status: if prof.gross_profit_margin > 0.1 {
                "Good".to_string()
            } else {
                "Needs Improvement".to_string()
            },
        }),
        Err(err) => rows.push(FlatRow {
            metric: "gross_profit_margin",
            value: NOT_AVAILABLE.to_string(),
            status: err.kind().to_string(),
        }),
    }

    rows.push(FlatRow {
        metric: "health_score",
        value: format!("{}/100", report.health_score.score),
        status: report.health_score.grade.to_string(),
    });

    if let Ok(trend) = &report.trend_analysis {
        rows.push(FlatRow {
            metric: "trend_slope",
            value: format!("{:.2}", trend.trend_slope),
            status: trend.current_trajectory.as_str().to_string(),
        });
    }

    rows.push(FlatRow {
        metric: "overall_risk",
        value: format!("{:?}", report.alerts.severity_levels.overall_risk),
        status: format!(
            "{} critical / {} warning",
            report.alerts.severity_levels.critical, report.alerts.severity_levels.warning
        ),
    });

    for (name, section) in [
        ("benchmark_profit_margin", &report.benchmark_analysis.profit_margin),
        (
            "benchmark_cash_flow_ratio",
            &report.benchmark_analysis.cash_flow_ratio,
        ),
        (
            "benchmark_expense_ratio",
            &report.benchmark_analysis.expense_ratio,
        ),
    ] {
        if let Some(comparison) = section {
            rows.push(FlatRow {
                metric: name,
                value: format!("{:.4}", comparison.your_performance),
                status: format!("p{}", comparison.percentile),
            });
        }
    }

    rows
}

/// Short free-text digest: headline metrics plus the top three immediate
/// actions. Values match the structured report exactly.
pub fn to_text_digest(report: &AnalysisReport) -> String {
    let mut out = String::from("FINANCIAL ANALYSIS SUMMARY\n\n");

    out.push_str(&format!(
        "OVERALL HEALTH SCORE: {}/100 ({})\n\n",
        report.health_score.score, report.health_score.grade
    ));

    out.push_str("KEY METRICS:\n");
    match &report.cash_flow {
        Ok(cf) => out.push_str(&format!("- Net cash flow: {:.2}\n", cf.net_cash_flow)),
        Err(_) => out.push_str(&format!("- Net cash flow: {NOT_AVAILABLE}\n")),
    }
    match &report.profitability {
        Ok(prof) => out.push_str(&format!(
            "- Gross profit margin: {:.4}\n",
            prof.gross_profit_margin
        )),
        Err(_) => out.push_str(&format!("- Gross profit margin: {NOT_AVAILABLE}\n")),
    }
    out.push_str(&format!(
        "- Financial health: {}\n",
        report.health_score.assessment
    ));

    out.push_str("\nTOP RECOMMENDATIONS:\n");
    let top_actions: Vec<&String> = report
        .recommendations
        .immediate_actions
        .iter()
        .take(3)
        .collect();
    if top_actions.is_empty() {
        out.push_str("- No immediate actions required\n");
    } else {
        for (i, action) in top_actions.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, action));
        }
    }

    out
}
