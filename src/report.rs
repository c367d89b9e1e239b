use crate::anomaly::{detect_anomalies, AnomalyReport};
use crate::benchmark::{compare_to_industry, BenchmarkReport};
use crate::cash_flow::{analyze_cash_flow, CashFlowSummary};
use crate::error::{AnalysisError, MetricResult, Result};
use crate::health::{score_financial_health, HealthScore};
use crate::narrative::{NarrativeContext, NarrativeGenerator, TemplateNarrative};
use crate::profitability::{analyze_profitability, ProfitabilitySummary};
use crate::rules::{
    create_alerts, generate_insights, generate_recommendations, AlertReport, BusinessSize,
    InsightBundle, MetricsView, RecommendationPlan,
};
use crate::schema::{normalize_table, FinancialDataset, RawTable};
use crate::trend::{analyze_trend, TrendForecast};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Caller configuration. Unknown industry or size codes silently fall back
/// to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub industry: String,
    pub business_size: BusinessSize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            industry: "default".to_string(),
            business_size: BusinessSize::Small,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub period_months: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQuality {
    pub rows_processed: usize,
    pub columns_resolved: Vec<&'static str>,
    pub date_range: DateRange,
    /// Non-null cell ratio over the surviving rows, as a percentage.
    pub completeness_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioAnalysis {
    pub realistic: Vec<f64>,
    pub optimistic: Vec<f64>,
    pub pessimistic: Vec<f64>,
}

const FORECAST_ASSUMPTIONS: &[&str] = &[
    "Based on historical trend patterns",
    "Assumes no major business changes",
    "External factors not considered",
];

#[derive(Debug, Clone, Serialize)]
pub struct ForecastSection {
    pub next_six_months: Vec<f64>,
    pub confidence_level: Confidence,
    pub assumptions: Vec<&'static str>,
    pub scenario_analysis: ScenarioAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Alert,
    Improvement,
    Strategic,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionItem {
    pub priority: Priority,
    pub category: ActionCategory,
    pub action: String,
    pub timeline: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveSummary {
    pub overall_health: String,
    pub key_findings: Vec<String>,
    pub critical_issues: Vec<String>,
    pub opportunities: Vec<String>,
    pub next_steps: Vec<String>,
}

/// The complete nested report. Intended for direct serialization; section
/// errors appear as tagged placeholders rather than aborting assembly.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub data_quality: DataQuality,
    #[serde(with = "crate::error::metric_section")]
    pub cash_flow: MetricResult<CashFlowSummary>,
    #[serde(with = "crate::error::metric_section")]
    pub profitability: MetricResult<ProfitabilitySummary>,
    #[serde(with = "crate::error::metric_section")]
    pub trend_analysis: MetricResult<TrendForecast>,
    pub health_score: HealthScore,
    #[serde(with = "crate::error::metric_section")]
    pub anomalies: MetricResult<AnomalyReport>,
    pub benchmark_analysis: BenchmarkReport,
    pub insights: InsightBundle,
    pub recommendations: RecommendationPlan,
    pub alerts: AlertReport,
    #[serde(with = "crate::error::metric_section")]
    pub forecast: MetricResult<ForecastSection>,
    pub action_items: Vec<ActionItem>,
    pub executive_summary: ExecutiveSummary,
    pub narrative: String,
}

/// Runs the full pipeline with the built-in template narrative.
pub fn analyze(table: &RawTable, options: &AnalysisOptions) -> Result<AnalysisReport> {
    analyze_with_narrative(table, options, &TemplateNarrative)
}

/// Runs the full pipeline with an injected narrative generator. A generator
/// failure degrades to the template fallback; it never fails the report.
pub fn analyze_with_narrative(
    table: &RawTable,
    options: &AnalysisOptions,
    generator: &dyn NarrativeGenerator,
) -> Result<AnalysisReport> {
    info!(
        "Analyzing table: {} rows, {} columns, industry '{}'",
        table.rows.len(),
        table.columns.len(),
        options.industry
    );

    let mut dataset = normalize_table(table);
    if dataset.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    dataset.sort_by_date();

    let cash_flow = analyze_cash_flow(&dataset);
    let profitability = analyze_profitability(&dataset);
    let trend = analyze_trend(&dataset);
    let anomalies = detect_anomalies(&dataset);
    let health = score_financial_health(&cash_flow, &profitability, &trend);

    let benchmark = compare_to_industry(&cash_flow, &profitability, &options.industry);
    let insights = generate_insights(&cash_flow, &profitability, &trend, &health);
    let view = MetricsView {
        cash_flow: cash_flow.as_ref().ok(),
        profitability: profitability.as_ref().ok(),
        trend: trend.as_ref().ok(),
    };
    let recommendations = generate_recommendations(view, &benchmark, options.business_size);
    let alerts = create_alerts(&cash_flow, &profitability, &anomalies, &health);

    let forecast = build_forecast(&trend);
    let action_items = build_action_items(&alerts, &recommendations);
    let executive_summary =
        build_executive_summary(&health, &cash_flow, &profitability, &recommendations);

    let context = narrative_context(&dataset, &cash_flow, &profitability, &trend, &health);
    let narrative = match generator.generate(&context) {
        Ok(text) => text,
        Err(err) => {
            warn!("Narrative generator failed, using template fallback: {err}");
            TemplateNarrative.generate(&context).unwrap_or_default()
        }
    };

    Ok(AnalysisReport {
        data_quality: build_data_quality(&dataset),
        cash_flow,
        profitability,
        trend_analysis: trend,
        health_score: health,
        anomalies,
        benchmark_analysis: benchmark,
        insights,
        recommendations,
        alerts,
        forecast,
        action_items,
        executive_summary,
        narrative,
    })
}

fn build_data_quality(dataset: &FinancialDataset) -> DataQuality {
    let span = dataset.date_span();
    DataQuality {
        rows_processed: dataset.len(),
        columns_resolved: dataset.resolved.names(),
        date_range: DateRange {
            start_date: span.map(|(start, _)| start),
            end_date: span.map(|(_, end)| end),
            period_months: span
                .map(|(start, end)| (end - start).num_days() as f64 / 30.0)
                .unwrap_or(0.0),
        },
        completeness_score: dataset.completeness(),
    }
}

fn build_forecast(trend: &MetricResult<TrendForecast>) -> MetricResult<ForecastSection> {
    let trend = match trend {
        Ok(t) => t,
        Err(err) => return Err(err.clone()),
    };

    let realistic = trend.forecast.clone();
    Ok(ForecastSection {
        next_six_months: realistic.clone(),
        confidence_level: if trend.r_squared > 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        },
        assumptions: FORECAST_ASSUMPTIONS.to_vec(),
        scenario_analysis: ScenarioAnalysis {
            optimistic: realistic.iter().map(|v| v * 1.2).collect(),
            pessimistic: realistic.iter().map(|v| v * 0.8).collect(),
            realistic,
        },
    })
}

/// Alerts first, then immediate improvements, then strategic items; the
/// order is the priority order consumers rely on.
fn build_action_items(alerts: &AlertReport, recommendations: &RecommendationPlan) -> Vec<ActionItem> {
    let mut items = Vec::new();

    for alert in &alerts.critical_alerts {
        items.push(ActionItem {
            priority: Priority::High,
            category: ActionCategory::Alert,
            action: alert.message.clone(),
            timeline: "immediate",
        });
    }

    for action in &recommendations.immediate_actions {
        items.push(ActionItem {
            priority: Priority::Medium,
            category: ActionCategory::Improvement,
            action: action.clone(),
            timeline: "1-2 weeks",
        });
    }

    for action in &recommendations.strategic_recommendations {
        items.push(ActionItem {
            priority: Priority::Low,
            category: ActionCategory::Strategic,
            action: action.clone(),
            timeline: "1-3 months",
        });
    }

    items
}

fn build_executive_summary(
    health: &HealthScore,
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    recommendations: &RecommendationPlan,
) -> ExecutiveSummary {
    let mut key_findings = Vec::new();
    let mut critical_issues = Vec::new();
    let mut opportunities = Vec::new();

    match cash_flow {
        Ok(cf) if cf.net_cash_flow > 0.0 => {
            key_findings.push(format!("Positive cash flow of ${:.2}", cf.net_cash_flow));
        }
        Ok(cf) => {
            critical_issues.push(format!("Negative cash flow of ${:.2}", cf.net_cash_flow));
        }
        Err(_) => {
            critical_issues
                .push("Cash flow could not be calculated from the available data".to_string());
        }
    }

    match profitability {
        Ok(prof) if prof.gross_profit_margin > 0.15 => {
            key_findings.push(format!(
                "Strong profit margin of {:.1}%",
                prof.gross_profit_margin * 100.0
            ));
        }
        Ok(prof) if prof.gross_profit_margin > 0.0 => {
            opportunities.push("Opportunity to improve profit margins".to_string());
        }
        _ => {
            critical_issues
                .push("Operating at a loss or unable to calculate profitability".to_string());
        }
    }

    key_findings.truncate(3);

    ExecutiveSummary {
        overall_health: health.grade.to_string(),
        key_findings,
        critical_issues,
        opportunities,
        next_steps: recommendations
            .immediate_actions
            .iter()
            .take(3)
            .cloned()
            .collect(),
    }
}

fn narrative_context(
    dataset: &FinancialDataset,
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    trend: &MetricResult<TrendForecast>,
    health: &HealthScore,
) -> NarrativeContext {
    let span = dataset.date_span();
    NarrativeContext {
        net_cash_flow: cash_flow.as_ref().ok().map(|cf| cf.net_cash_flow),
        total_income: cash_flow.as_ref().ok().map(|cf| cf.total_income),
        total_expenses: cash_flow.as_ref().ok().map(|cf| cf.total_expenses),
        cash_flow_ratio: cash_flow.as_ref().ok().map(|cf| cf.cash_flow_ratio),
        gross_profit_margin: profitability.as_ref().ok().map(|p| p.gross_profit_margin),
        trend_slope: trend.as_ref().ok().map(|t| t.trend_slope),
        trajectory: trend
            .as_ref()
            .ok()
            .map(|t| t.current_trajectory.as_str().to_string()),
        health_score: health.score,
        health_grade: health.grade.to_string(),
        period_start: span.map(|(start, _)| start),
        period_end: span.map(|(_, end)| end),
    }
}
