// Natural-language insights via the Gemini generateContent API. Any
// failure on this path degrades to a fixed fallback list; a report is
// never lost to a flaky model call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::{AppError, AppResult};

use super::stats::MonthlyStats;

/// Produces a short list of insight strings from one month's statistics.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, stats: &MonthlyStats, period_label: &str) -> AppResult<Vec<String>>;
}

/// Generic insights used whenever the generator fails or returns garbage.
pub fn fallback_insights() -> Vec<String> {
    vec![
        "Your highest expense category this month might need attention.".to_string(),
        "Consider setting up a budget for better financial management.".to_string(),
        "Track your recurring expenses to identify potential savings.".to_string(),
    ]
}

pub struct GeminiInsightGenerator {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: String,
}

impl GeminiInsightGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl InsightGenerator for GeminiInsightGenerator {
    async fn generate(&self, stats: &MonthlyStats, period_label: &str) -> AppResult<Vec<String>> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let request = GeminiRequest {
            contents: vec![json!({ "parts": [{ "text": build_prompt(stats, period_label) }] })],
        };

        let response = self
            .client
            .post(&url)
            .timeout(std::time::Duration::from_secs(20))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let body: GeminiResponse = response.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AppError::ExternalError("Gemini returned no candidates".to_string()))?;

        parse_insights(text)
    }
}

fn build_prompt(stats: &MonthlyStats, period_label: &str) -> String {
    let categories = stats
        .by_category
        .iter()
        .map(|(category, amount)| format!("{}: ${}", category, amount))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze this financial data and provide 3 concise, actionable insights.\n\
         Focus on spending patterns and practical advice.\n\
         Keep it friendly and conversational.\n\n\
         Financial Data for {}:\n\
         - Total Income: ${}\n\
         - Total Expenses: ${}\n\
         - Net Income: ${}\n\
         - Expense Categories: {}\n\n\
         Format the response as a JSON array of strings, like this:\n\
         [\"insight 1\", \"insight 2\", \"insight 3\"]",
        period_label,
        stats.total_income,
        stats.total_expenses,
        stats.net_income(),
        categories,
    )
}

/// The model wraps its JSON in markdown fences more often than not.
fn parse_insights(text: &str) -> AppResult<Vec<String>> {
    let cleaned = text
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    serde_json::from_str(&cleaned).map_err(|e| {
        warn!("Unparseable insight payload: {:?}", e);
        AppError::ExternalError(format!("Invalid insight response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prompt_carries_the_month_and_the_category_breakdown() {
        let mut stats = MonthlyStats {
            total_income: dec!(5000),
            total_expenses: dec!(1700),
            transaction_count: 4,
            ..Default::default()
        };
        stats.by_category.insert("housing".to_string(), dec!(1200));
        stats.by_category.insert("groceries".to_string(), dec!(500));

        let prompt = build_prompt(&stats, "March");

        assert!(prompt.contains("Financial Data for March"));
        assert!(prompt.contains("Total Income: $5000"));
        assert!(prompt.contains("Net Income: $3300"));
        assert!(prompt.contains("groceries: $500, housing: $1200"));
    }

    #[test]
    fn test_parse_insights_strips_code_fences() {
        let fenced = "```json\n[\"Spend less on takeout.\", \"Save the rest.\"]\n```";
        let insights = parse_insights(fenced).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0], "Spend less on takeout.");

        let bare = "[\"One insight\"]";
        assert_eq!(parse_insights(bare).unwrap(), vec!["One insight"]);
    }

    #[test]
    fn test_parse_insights_rejects_prose() {
        assert!(parse_insights("Here are some thoughts about your month.").is_err());
    }

    #[test]
    fn test_fallback_list_is_stable() {
        let fallback = fallback_insights();
        assert_eq!(fallback.len(), 3);
        assert_eq!(
            fallback[0],
            "Your highest expense category this month might need attention."
        );
    }
}
