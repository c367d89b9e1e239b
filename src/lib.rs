//! # Financial Insight Engine
//!
//! A library for turning messy, heterogeneous transaction tables into
//! financial metrics, industry benchmark comparisons, and a prioritized
//! insight report.
//!
//! ## Core Concepts
//!
//! - **Schema resolution**: arbitrary column names are mapped onto a
//!   canonical schema (date, amount, income, expenses, revenue, costs,
//!   category) by a deterministic keyword pass
//! - **Metric calculators**: cash flow, profitability, trend forecast,
//!   anomaly detection, and a composite health score, each returning either
//!   a populated result or a tagged data-insufficiency error
//! - **Rule engine**: ordered predicate/render tables turn metric values
//!   into insights, recommendations, and severity-graded alerts
//! - **Best-effort assembly**: one failed section becomes a placeholder in
//!   the report; only a dataset with no usable rows is fatal
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_insight_engine::*;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let mut row = BTreeMap::new();
//! row.insert("Date".to_string(), json!("2024-01-05"));
//! row.insert("Amount".to_string(), json!("$5,000"));
//! row.insert("Category".to_string(), json!("Client Payment"));
//!
//! let table = RawTable::from_rows(vec![row]);
//! let report = analyze(&table, &AnalysisOptions::default())?;
//! println!("{}", to_text_digest(&report));
//! ```

pub mod anomaly;
pub mod benchmark;
pub mod cash_flow;
pub mod error;
pub mod export;
pub mod health;
pub mod narrative;
pub mod profitability;
pub mod report;
pub mod rules;
pub mod schema;
pub mod stats;
pub mod trend;

#[cfg(feature = "narrative")]
pub mod llm;

pub use anomaly::{detect_anomalies, AnomalousRecord, AnomalyReport, CONTAMINATION, RANDOM_SEED};
pub use benchmark::{
    compare_to_industry, industry_benchmarks, BenchmarkComparison, BenchmarkRatios,
    BenchmarkReport, RelativePerformance, BENCHMARK_TABLE_VERSION,
};
pub use cash_flow::{analyze_cash_flow, CashFlowSummary};
pub use error::{AnalysisError, DatasetGuidance, MetricResult, Result};
pub use export::{to_flat_table, to_json, to_text_digest, FlatRow};
pub use health::{score_financial_health, HealthScore};
pub use narrative::{NarrativeContext, NarrativeGenerator, TemplateNarrative};
pub use profitability::{analyze_profitability, BreakEvenAnalysis, ProfitabilitySummary};
pub use report::{
    analyze, analyze_with_narrative, ActionItem, AnalysisOptions, AnalysisReport, DataQuality,
    ExecutiveSummary, ForecastSection,
};
pub use rules::{
    create_alerts, generate_insights, generate_recommendations, Alert, AlertReport, BusinessSize,
    InsightBundle, MetricsView, OverallRisk, RecommendationPlan,
};
pub use schema::{
    normalize_table, parse_date_str, resolve_schema, CanonicalColumn, CategoryMask,
    FinancialDataset, FinancialRecord, MonthlyBucket, RawRow, RawTable, ResolvedColumns,
};
pub use trend::{analyze_trend, Trajectory, TrendForecast};

#[cfg(feature = "narrative")]
pub use llm::GeminiNarrator;
