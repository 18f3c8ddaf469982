//! Chat-completion analyzer
//!
//! Sends the transcript to an OpenAI-style chat-completions endpoint
//! with an instruction to answer in strict JSON. Partial or malformed
//! payloads degrade to default content instead of failing the request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AnalysisError, PitchAnalyzer, Verdict, MAX_FEEDBACK_ITEMS};

const SYSTEM_PROMPT: &str = "You are an expert sales pitch analyzer. Analyze the given sales pitch transcription and provide:\n\
1. An overall score from 1-10 (10 being excellent)\n\
2. A brief summary of the pitch\n\
3. Exactly 2 key strengths\n\
4. Exactly 2 areas for improvement\n\n\
Respond with JSON in this exact format:\n\
{\n\
  \"score\": number,\n\
  \"summary\": \"string\",\n\
  \"strengths\": [\"strength1\", \"strength2\"],\n\
  \"improvements\": [\"improvement1\", \"improvement2\"]\n\
}";

const FALLBACK_SUMMARY: &str = "Analysis unavailable";
const FALLBACK_STRENGTH: &str = "Unable to analyze strengths";
const FALLBACK_IMPROVEMENT: &str = "Unable to analyze improvements";

/// Chat analyzer configuration
#[derive(Debug, Clone)]
pub struct ChatAnalyzerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for ChatAnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// LLM-backed pitch analyzer
pub struct ChatAnalyzer {
    config: ChatAnalyzerConfig,
    client: Client,
}

impl ChatAnalyzer {
    pub fn new(config: ChatAnalyzerConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PitchAnalyzer for ChatAnalyzer {
    async fn analyze(&self, transcript: &str) -> Result<Verdict, AnalysisError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Please analyze this sales pitch transcription:\n\n{}",
                        transcript
                    ),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Request(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Request(format!("invalid response: {}", e)))?;

        let content = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        let payload: Value = serde_json::from_str(&content).unwrap_or_default();
        Ok(verdict_from_payload(&payload))
    }
}

/// Normalize whatever JSON the model produced into a well-formed
/// verdict. Never fails; missing or malformed fields fall back to
/// defaults.
pub(crate) fn verdict_from_payload(payload: &Value) -> Verdict {
    let raw_score = payload.get("score").and_then(Value::as_f64).unwrap_or(5.0);

    Verdict {
        score: clamp_score(raw_score),
        summary: payload
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_SUMMARY)
            .to_string(),
        strengths: feedback_list(payload.get("strengths"), FALLBACK_STRENGTH),
        improvements: feedback_list(payload.get("improvements"), FALLBACK_IMPROVEMENT),
    }
}

/// Clamp into [1, 10], then round to the nearest integer.
fn clamp_score(raw: f64) -> i64 {
    raw.clamp(1.0, 10.0).round() as i64
}

/// Keep at most [`MAX_FEEDBACK_ITEMS`] string entries; a missing,
/// malformed or empty list becomes a single fallback entry.
fn feedback_list(value: Option<&Value>, fallback: &str) -> Vec<String> {
    let entries: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .take(MAX_FEEDBACK_ITEMS)
                .collect()
        })
        .unwrap_or_default();

    if entries.is_empty() {
        vec![fallback.to_string()]
    } else {
        entries
    }
}
