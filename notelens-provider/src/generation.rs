//! Answer-generation model trait and OpenAI-compatible HTTP client.

use crate::config::ProviderConfig;
use crate::embedding::api_error_message;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Trait for models that turn a prompt into prose.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name/identifier of this model, for logs and reports.
    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpChatClient {
    /// Build a client, verifying up front that a key is configured.
    pub fn create(config: ProviderConfig) -> Result<Self> {
        config.require_api_key()?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl ChatModel for HttpChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self.config.require_api_key()?;
        tracing::debug!(model = %self.config.chat_model, chars = prompt.len(), "requesting completion");

        let response = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "model": self.config.chat_model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::api(status.as_u16(), api_error_message(&body)));
        }

        extract_message(&body)
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

/// Pull the assistant message text out of a raw response body.
fn extract_message(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("chat response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| ProviderError::malformed("chat response carried no message"))
}
