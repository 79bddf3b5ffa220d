//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(self.convert_messages(&request.messages));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // o1/o3 and GPT-5.x models use max_completion_tokens and ignore temperature
        let reasoning_model =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if reasoning_model {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
            body["temperature"] = serde_json::json!(request.temperature.unwrap_or(self.temperature));
        }

        body
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choice_count = api_response.choices.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.choices.into_iter().next() {
            Some(choice) => (
                choice.message.content,
                choice
                    .finish_reason
                    .as_deref()
                    .map(StopReason::from_openai)
                    .unwrap_or(StopReason::EndTurn),
            ),
            None => (None, StopReason::EndTurn),
        };

        CompletionResponse {
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: api_response.usage.prompt_tokens,
                output_tokens: api_response.usage.completion_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error: Option<LlmError> = None;
        for attempt in 0..=MAX_RETRIES {
            if let Some(delay) = last_error.as_ref().map(|e| e.retry_delay(attempt)) {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "complete: retrying after transient error");
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                debug!("complete: success");
                let api_response: OpenAIResponse = response.json().await?;
                return Ok(self.parse_response(api_response));
            }

            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            let err = LlmError::from_status(status, &headers, text);
            if !err.is_retryable() {
                debug!(%status, "complete: API error");
                return Err(err);
            }
            debug!(attempt, status, "complete: retryable error");
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::failing_endpoint;
    use std::sync::atomic::Ordering;

    fn client(model: &str, max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: model.to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens,
            temperature: 0.6,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let request = CompletionRequest {
            system_prompt: "You are an expert at extracting information from contracts".to_string(),
            messages: vec![Message::user("Extract"), Message::assistant("{bad"), Message::user("Fix it")],
            max_tokens: 1000,
            temperature: None,
        };

        let body = client("gpt-4o", 8192).build_request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert!((body["temperature"].as_f64().unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "{bad");
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_extraction_budget_survives_default_config() {
        let defaults = LlmConfig::default();
        let client = OpenAIClient {
            model: defaults.model,
            api_key: "test-key".to_string(),
            base_url: defaults.base_url,
            http: Client::new(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        };
        let request = CompletionRequest {
            system_prompt: "Extract".to_string(),
            messages: vec![Message::user("contract text")],
            max_tokens: crate::analysis::EXTRACTION_MAX_TOKENS,
            temperature: None,
        };

        let body = client.build_request_body(&request);
        assert_eq!(body["max_tokens"], 16_384);
    }

    #[test]
    fn test_max_tokens_capped() {
        let request = CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![],
            max_tokens: 5000,
            temperature: Some(0.0),
        };

        let body = client("gpt-4o", 1000).build_request_body(&request);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_reasoning_model_uses_completion_tokens() {
        let request = CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![],
            max_tokens: 500,
            temperature: None,
        };

        let body = client("o3-mini", 4096).build_request_body(&request);
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response() {
        let raw = r#"{
            "choices": [{"message": {"content": "{\"ok\": true}"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let api_response: OpenAIResponse = serde_json::from_str(raw).unwrap();
        let response = client("gpt-4o", 1000).parse_response(api_response);

        assert_eq!(response.content.as_deref(), Some("{\"ok\": true}"));
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 5);
    }

    fn chat_reply() -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": "{\"ok\": true}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1}
        })
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (base_url, hits) = failing_endpoint("/v1/chat/completions", 429, 2, chat_reply()).await;
        let mut client = client("gpt-4o", 1000);
        client.base_url = base_url;

        let response = client.complete(request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"ok\": true}"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_after_retries() {
        let (base_url, hits) = failing_endpoint("/v1/chat/completions", 429, usize::MAX, chat_reply()).await;
        let mut client = client("gpt-4o", 1000);
        client.base_url = base_url;

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base_url, hits) = failing_endpoint("/v1/chat/completions", 400, 1, chat_reply()).await;
        let mut client = client("gpt-4o", 1000);
        client.base_url = base_url;

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 400, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
