//! Text-Generation Backend
//!
//! Narrow interface to the external generation service: one prompt in, one
//! completion out. No streaming, no multi-turn state, no retry loop. A failed
//! call degrades the pipeline run; it never aborts the process.

use crate::config::GeneratorConfig;
use crate::error::BackendError;
use crate::http::{build_http_client, map_status_error, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const GENERATION_MAX_TOKENS: u32 = 1000;
const GENERATION_TEMPERATURE: f32 = 0.7;

/// Generation client interface consumed by the pipeline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate one completion for the assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Model identifier sent with each request.
    fn model_name(&self) -> &str;
}

// Chat-completions request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiGenerator {
    http: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, BackendError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("generator api_key is not set".into()))?;

        Ok(Self {
            http: build_http_client()?,
            model: config.model.clone(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending generation request");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => BackendError::RequestFailed(format!("Model not found: {}", body)),
                _ => map_status_error(status, body),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BackendError::MalformedResponse("No choices in response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_requires_api_key() {
        let config = GeneratorConfig::default();
        assert!(matches!(
            OpenAiGenerator::new(&config),
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_generator_uses_configured_model_and_default_endpoint() {
        let config = GeneratorConfig {
            model: "gpt-4-turbo".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
        };
        let generator = OpenAiGenerator::new(&config).unwrap();
        assert_eq!(generator.model_name(), "gpt-4-turbo");
        assert_eq!(generator.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4-turbo".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
        };

        let value: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4-turbo");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 1000);
    }
}
