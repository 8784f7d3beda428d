// LLM-backed analyzer - delegates scoring to the Anthropic Messages API.
//
// Same contract as the rule-based analyzer, behind the same trait. The
// model is asked for the score fields as a JSON object; anything that
// goes wrong (transport, timeout, unparseable output) surfaces as a
// typed AnalysisError so the fallback policy upstream can take over.

use crate::core::analysis::{AnalysisError, Analyzer, ContentAnalysis};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// The analyzer call must never stall a worker; the HTTP client enforces
/// this deadline on the whole request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_TOKENS: u32 = 1024;

pub struct ClaudeAnalyzer {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeAnalyzer {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_model(api_key: String, model: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn prompt(content: &str) -> String {
        format!(
            r#"Analyze the following content for moderation purposes.
Rate each category from 0.0 to 1.0 and provide detected issues.

Content: "{content}"

Provide a JSON response with:
{{
    "toxicity_score": <float>,
    "spam_score": <float>,
    "sarcasm_score": <float>,
    "detected_issues": [<list of specific issues found>],
    "analysis": "<brief explanation>"
}}"#
        )
    }

    /// Pull the scores out of the model's reply text.
    ///
    /// The model is instructed to answer with a bare JSON object; missing
    /// score fields default to 0.0 and everything is clamped into range.
    fn parse_analysis(text: &str) -> Result<ContentAnalysis, AnalysisError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        let score = |field: &str| -> f64 {
            value
                .get(field)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        };

        let issues = value
            .get("detected_issues")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let rationale = value
            .get("analysis")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(ContentAnalysis {
            toxicity: score("toxicity_score"),
            spam: score("spam_score"),
            sarcasm: score("sarcasm_score"),
            issues,
            rationale,
        })
    }
}

#[async_trait]
impl Analyzer for ClaudeAnalyzer {
    async fn analyze(&self, content: &str) -> Result<ContentAnalysis, AnalysisError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": Self::prompt(content),
            }],
        });

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout
                } else {
                    AnalysisError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Transport(format!(
                "Anthropic API error: {status} - {text}"
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        let text = response_json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("no text block in response".to_string())
            })?;

        Self::parse_analysis(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_reply() {
        let reply = r#"{
            "toxicity_score": 0.7,
            "spam_score": 0.1,
            "sarcasm_score": 0.0,
            "detected_issues": ["insulting tone"],
            "analysis": "direct insult aimed at another user"
        }"#;

        let analysis = ClaudeAnalyzer::parse_analysis(reply).unwrap();

        assert_eq!(analysis.toxicity, 0.7);
        assert_eq!(analysis.spam, 0.1);
        assert_eq!(analysis.issues, vec!["insulting tone"]);
        assert!(analysis.rationale.contains("insult"));
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let analysis = ClaudeAnalyzer::parse_analysis(r#"{"toxicity_score": 0.4}"#).unwrap();

        assert_eq!(analysis.toxicity, 0.4);
        assert_eq!(analysis.spam, 0.0);
        assert_eq!(analysis.sarcasm, 0.0);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let reply = r#"{"toxicity_score": 1.7, "spam_score": -0.3}"#;
        let analysis = ClaudeAnalyzer::parse_analysis(reply).unwrap();

        assert_eq!(analysis.toxicity, 1.0);
        assert_eq!(analysis.spam, 0.0);
    }

    #[test]
    fn non_json_reply_is_malformed() {
        let err = ClaudeAnalyzer::parse_analysis("I cannot rate this content.").unwrap_err();

        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn prompt_embeds_the_content() {
        let prompt = ClaudeAnalyzer::prompt("hello world");

        assert!(prompt.contains("\"hello world\""));
        assert!(prompt.contains("toxicity_score"));
    }
}
