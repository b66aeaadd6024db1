//! Configuration for provider clients.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no key is set explicitly.
pub const API_KEY_ENV: &str = "NOTELENS_API_KEY";

/// Connection and model settings shared by the HTTP provider clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API, without a trailing slash.
    pub base_url: String,
    /// Model used for `/embeddings` requests.
    pub embedding_model: String,
    /// Model used for `/chat/completions` requests.
    pub chat_model: String,
    /// Expected embedding dimensionality. Fixed by the embedding service;
    /// every vector the service returns must have this length.
    pub dimension: usize,
    /// Bearer token. Never serialized and never read from config files;
    /// it is injected explicitly or via [`ProviderConfig::with_env_api_key`].
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::openai()
    }
}

impl ProviderConfig {
    /// Settings for the hosted OpenAI API with its small embedding model.
    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            dimension: 1536,
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Fill the key from `NOTELENS_API_KEY` if none was set explicitly.
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        self
    }

    /// The configured key, or a [`ProviderError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey {
                env_hint: API_KEY_ENV.to_string(),
            })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_defaults() {
        let config = ProviderConfig::openai();
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.dimension, 1536);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn builder_methods_chain() {
        let config = ProviderConfig::openai()
            .with_base_url("http://localhost:8080/v1/")
            .with_api_key("secret")
            .with_dimension(384);

        assert_eq!(config.require_api_key().unwrap(), "secret");
        assert_eq!(config.dimension, 384);
        assert_eq!(config.endpoint("embeddings"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let config = ProviderConfig::openai().with_api_key("");
        assert!(config.require_api_key().is_err());
    }
}
