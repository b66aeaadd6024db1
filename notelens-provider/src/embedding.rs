//! Embedding provider trait and OpenAI-compatible HTTP client.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Trait for services that turn text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. The returned vector always has
    /// [`dimension`](Self::dimension) entries.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Name/identifier of this provider, for logs and reports.
    fn provider_name(&self) -> &str;
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    /// Build a client, verifying up front that a key is configured.
    pub fn create(config: ProviderConfig) -> Result<Self> {
        config.require_api_key()?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.config.require_api_key()?;
        tracing::debug!(
            model = %self.config.embedding_model,
            chars = text.len(),
            "requesting embedding"
        );

        let response = self
            .http
            .post(self.config.endpoint("embeddings"))
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "model": self.config.embedding_model,
                "input": text,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::api(status.as_u16(), api_error_message(&body)));
        }

        extract_embedding(&body, self.config.dimension)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        &self.config.embedding_model
    }
}

/// Pull the vector out of a raw response body, checking its dimensionality.
fn extract_embedding(body: &str, expected_dimension: usize) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("embedding response: {e}")))?;

    let vector = parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ProviderError::malformed("embedding response carried no data"))?;

    if vector.is_empty() {
        return Err(ProviderError::malformed("embedding vector was empty"));
    }
    if expected_dimension != 0 && vector.len() != expected_dimension {
        return Err(ProviderError::malformed(format!(
            "embedding has {} dimensions, expected {}",
            vector.len(),
            expected_dimension
        )));
    }
    Ok(vector)
}

/// Best-effort extraction of the server's error message, falling back to the
/// raw body.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vector_from_openai_shape() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2,0.3]}],"model":"text-embedding-3-small"}"#;
        let vector = extract_embedding(body, 3).unwrap();
        assert_eq!(vector, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn empty_data_is_malformed() {
        let body = r#"{"data":[]}"#;
        assert!(matches!(
            extract_embedding(body, 3),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn wrong_dimension_is_malformed() {
        let body = r#"{"data":[{"embedding":[0.1,0.2]}]}"#;
        assert!(extract_embedding(body, 3).is_err());
    }

    #[test]
    fn api_error_message_prefers_server_detail() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#;
        assert_eq!(api_error_message(body), "You exceeded your current quota");

        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn create_requires_a_key() {
        assert!(HttpEmbeddingClient::create(ProviderConfig::openai()).is_err());
        let client =
            HttpEmbeddingClient::create(ProviderConfig::openai().with_api_key("k")).unwrap();
        assert_eq!(client.dimension(), 1536);
    }
}
