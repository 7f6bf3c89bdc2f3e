//! Model inference via the Mistral chat completions API.
//!
//! Speaks the OpenAI-compatible `/v1/chat/completions` format.

use crate::error::InferenceError;
use crate::inference::CompletionProvider;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inference client wrapping the Mistral chat API.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Pricing per 1M tokens (prompt, completion) in USD.
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("mistral-small", 0.10, 0.30),
    ("mistral-medium", 0.40, 2.00),
    ("mistral-large", 2.00, 6.00),
    ("open-mistral-nemo", 0.15, 0.15),
    ("ministral-8b", 0.10, 0.10),
    ("ministral-3b", 0.04, 0.04),
];

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Run a single chat completion.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Completion, InferenceError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        debug!("Inference request to model: {} ({} turns)", model, messages.len());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(InferenceError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status { status, body });
        }

        let body: ChatCompletionResponse = resp.json().await.map_err(InferenceError::Decode)?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InferenceError::EmptyReply)?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(Completion { content, usage })
    }

    /// Estimate the USD cost of a token usage for a given model.
    pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
        let (prompt_rate, completion_rate) = MODEL_PRICING
            .iter()
            .find(|(name, _, _)| model.contains(name))
            .map(|(_, p, c)| (*p, *c))
            .unwrap_or((0.10, 0.30)); // Default to mistral-small pricing

        let prompt_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * prompt_rate;
        let completion_cost = (usage.completion_tokens as f64 / 1_000_000.0) * completion_rate;
        prompt_cost + completion_cost
    }
}

#[async_trait]
impl CompletionProvider for InferenceClient {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError> {
        let completion = self
            .chat(
                &request.model,
                &request.messages,
                request.temperature,
                request.max_tokens,
            )
            .await?;

        debug!(
            "Token usage: {} prompt / {} completion (~${:.6})",
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens,
            Self::estimate_cost(&request.model, &completion.usage),
        );

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_payload_matches_openai_shape() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "mistral-small-latest",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 1000,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "mistral-small-latest",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7,
                "max_tokens": 1000
            })
        );
    }

    #[test]
    fn response_without_usage_parses() {
        let body: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Bonjour"}}]
        }))
        .unwrap();
        assert!(body.usage.is_none());
        assert_eq!(body.choices[0].message.content.as_deref(), Some("Bonjour"));
    }

    #[test]
    fn cost_uses_model_table() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            total_tokens: 2_000_000,
        };
        let small = InferenceClient::estimate_cost("mistral-small-latest", &usage);
        let large = InferenceClient::estimate_cost("mistral-large-latest", &usage);
        assert!((small - 0.40).abs() < 1e-9);
        assert!((large - 8.00).abs() < 1e-9);
    }

    #[test]
    fn cost_falls_back_for_unknown_model() {
        let usage = TokenUsage {
            prompt_tokens: 2_000_000,
            completion_tokens: 0,
            total_tokens: 2_000_000,
        };
        let cost = InferenceClient::estimate_cost("some-new-model", &usage);
        assert!((cost - 0.20).abs() < 1e-9);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = InferenceClient::new("https://api.mistral.ai/", "key");
        assert_eq!(client.base_url, "https://api.mistral.ai");
    }
}
