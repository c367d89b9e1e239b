use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("Unable to identify income and expense columns")]
    MissingFinancialSignal,

    #[error("Date column required for trend analysis")]
    MissingDateSignal,

    #[error("Insufficient history for trend analysis: {months} monthly bucket(s), need at least 2")]
    InsufficientHistory { months: usize },

    #[error("Insufficient data for anomaly detection: {rows} row(s), need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("Insufficient data for {0}")]
    InsufficientSignal(String),

    #[error("Unparsable date value: {0}")]
    InvalidDateFormat(String),

    #[error("No usable rows survived cleaning")]
    EmptyDataset,

    #[error("Narrative generation unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::SerializationError(err.to_string())
    }
}

impl AnalysisError {
    /// Stable machine-readable identifier used when a section-level error is
    /// embedded in the serialized report.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MissingFinancialSignal => "missing_financial_signal",
            AnalysisError::MissingDateSignal => "missing_date_signal",
            AnalysisError::InsufficientHistory { .. } => "insufficient_history",
            AnalysisError::InsufficientData { .. } => "insufficient_data",
            AnalysisError::InsufficientSignal(_) => "insufficient_signal",
            AnalysisError::InvalidDateFormat(_) => "invalid_date_format",
            AnalysisError::EmptyDataset => "empty_dataset",
            AnalysisError::NarrativeUnavailable(_) => "narrative_unavailable",
            AnalysisError::SerializationError(_) => "serialization_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Per-section outcome: a populated metric or a tagged data-insufficiency
/// error, never both. The report assembler turns errors into placeholders.
pub type MetricResult<T> = std::result::Result<T, AnalysisError>;

/// Serializes a [`MetricResult`] section: the value itself on success, or a
/// `{ "error": kind, "message": ... }` placeholder on failure, so one failed
/// section never suppresses its siblings. For use with `#[serde(with)]`.
pub mod metric_section {
    use super::MetricResult;
    use serde::ser::SerializeMap;
    use serde::{Serialize, Serializer};

    pub fn serialize<T, S>(value: &MetricResult<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Ok(inner) => inner.serialize(serializer),
            Err(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", error.kind())?;
                map.serialize_entry("message", &error.to_string())?;
                map.end()
            }
        }
    }
}

/// Corrective guidance returned alongside the fatal [`AnalysisError::EmptyDataset`].
#[derive(Debug, Clone, Serialize)]
pub struct DatasetGuidance {
    pub message: String,
    pub suggestions: Vec<&'static str>,
    pub example_columns: Vec<&'static str>,
}

impl DatasetGuidance {
    pub fn empty_dataset() -> Self {
        Self {
            message: AnalysisError::EmptyDataset.to_string(),
            suggestions: vec![
                "Any column names will work - financial columns are detected by keyword",
                "Supported signals: dates, amounts, income, expenses, categories",
                "Every row needs at least one parsable numeric value",
                "Dates must be parsable (e.g. 2024-01-31); rows with broken dates are dropped",
            ],
            example_columns: vec![
                "date/amount/category",
                "Date/Income/Expenses",
                "Time/Revenue/Cost",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(
            AnalysisError::MissingFinancialSignal.kind(),
            "missing_financial_signal"
        );
        assert_eq!(
            AnalysisError::InsufficientHistory { months: 1 }.kind(),
            "insufficient_history"
        );
        assert_eq!(
            AnalysisError::InsufficientData {
                rows: 9,
                required: 10
            }
            .kind(),
            "insufficient_data"
        );
    }

    #[test]
    fn test_empty_dataset_guidance() {
        let guidance = DatasetGuidance::empty_dataset();
        assert!(!guidance.suggestions.is_empty());
        assert!(guidance
            .example_columns
            .iter()
            .any(|c| c.contains("category")));
    }
}
