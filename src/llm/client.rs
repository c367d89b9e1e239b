use crate::error::{AnalysisError, Result};
use crate::narrative::{NarrativeContext, NarrativeGenerator};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Gemini-backed narrative generator. Calls are bounded by a hard timeout
/// and every failure maps to [`AnalysisError::NarrativeUnavailable`], which
/// the report assembler swallows by falling back to the template narrative.
#[derive(Clone)]
pub struct GeminiNarrator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiNarrator {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::NarrativeUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_prompt(context: &NarrativeContext) -> String {
        let mut prompt = String::from(
            "As a financial advisor, analyze these business metrics and write a short, \
             plain-prose summary with actionable observations:\n\n",
        );

        if let (Some(net), Some(income), Some(expenses)) = (
            context.net_cash_flow,
            context.total_income,
            context.total_expenses,
        ) {
            prompt.push_str(&format!(
                "Cash flow: net {net:.2}, income {income:.2}, expenses {expenses:.2}\n"
            ));
        }
        if let Some(ratio) = context.cash_flow_ratio {
            prompt.push_str(&format!("Cash flow ratio: {ratio:.2}\n"));
        }
        if let Some(margin) = context.gross_profit_margin {
            prompt.push_str(&format!("Gross profit margin: {:.1}%\n", margin * 100.0));
        }
        if let (Some(slope), Some(trajectory)) = (context.trend_slope, &context.trajectory) {
            prompt.push_str(&format!("Trend: {trajectory}, slope {slope:.2} per month\n"));
        }
        prompt.push_str(&format!(
            "Financial health score: {}/100 (grade {})\n",
            context.health_score, context.health_grade
        ));

        prompt.push_str(
            "\nRespond with 3-5 sentences of practical guidance. \
             Plain text only, no markdown.",
        );
        prompt
    }

    fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|e| AnalysisError::NarrativeUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::NarrativeUnavailable(format!(
                "API error (status {status}): {body}"
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .map_err(|e| AnalysisError::NarrativeUnavailable(e.to_string()))?;

        body.candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AnalysisError::NarrativeUnavailable("no text in model response".to_string())
            })
    }
}

impl NarrativeGenerator for GeminiNarrator {
    fn generate(&self, context: &NarrativeContext) -> Result<String> {
        self.generate_content(&Self::build_prompt(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_available_metrics() {
        let context = NarrativeContext {
            net_cash_flow: Some(3_800.0),
            total_income: Some(5_000.0),
            total_expenses: Some(1_200.0),
            cash_flow_ratio: Some(4.17),
            gross_profit_margin: Some(0.76),
            trend_slope: Some(120.0),
            trajectory: Some("improving".to_string()),
            health_score: 85,
            health_grade: "A".to_string(),
            ..Default::default()
        };

        let prompt = GeminiNarrator::build_prompt(&context);
        assert!(prompt.contains("net 3800.00"));
        assert!(prompt.contains("76.0%"));
        assert!(prompt.contains("improving"));
        assert!(prompt.contains("85/100"));
    }

    #[test]
    fn test_prompt_skips_missing_metrics() {
        let context = NarrativeContext {
            health_score: 10,
            health_grade: "F".to_string(),
            ..Default::default()
        };
        let prompt = GeminiNarrator::build_prompt(&context);
        assert!(!prompt.contains("Cash flow ratio"));
        assert!(!prompt.contains("Gross profit margin"));
        assert!(prompt.contains("10/100"));
    }
}
