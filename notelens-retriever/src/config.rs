//! TOML configuration for hosts and the CLI.
//!
//! A `notelens.toml` next to the notes directory tunes the provider
//! endpoint, chunk geometry, and retrieval defaults. Every section is
//! optional; an absent file means all defaults. The API key is never read
//! from the file — it comes from the `NOTELENS_API_KEY` environment
//! variable.
//!
//! ```toml
//! [provider]
//! base_url = "https://api.openai.com/v1"
//! embedding_model = "text-embedding-3-small"
//! chat_model = "gpt-4o-mini"
//! dimension = 1536
//!
//! [chunking]
//! chunk_size = 700
//! overlap = 100
//!
//! [retrieval]
//! top_k = 8
//! min_score = 0.7
//!
//! [indexing]
//! pace_ms = 100
//! progress_every = 10
//! ```

use anyhow::{Context, Result};
use notelens_context::chunk::ChunkingConfig;
use notelens_provider::ProviderConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::retrieval::indexer::IndexerConfig;
use crate::retrieval::retriever::RetrievalOptions;

/// File name looked up next to the notes directory.
pub const DEFAULT_CONFIG_FILE: &str = "notelens.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingSection {
    /// Delay between embedding calls, in milliseconds.
    pub pace_ms: u64,
    /// Progress notification cadence, in documents.
    pub progress_every: usize,
}

impl Default for IndexingSection {
    fn default() -> Self {
        Self {
            pace_ms: 100,
            progress_every: 10,
        }
    }
}

/// Top-level configuration: every section falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotelensConfig {
    pub provider: ProviderConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalOptions,
    pub indexing: IndexingSection,
}

impl NotelensConfig {
    /// Parse a specific config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Load `notelens.toml` from `dir` if present, defaults otherwise.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Provider settings with the API key filled from the environment.
    pub fn provider_config(&self) -> ProviderConfig {
        self.provider.clone().with_env_api_key()
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig::default()
            .with_chunking(self.chunking.clone())
            .with_pacing(Duration::from_millis(self.indexing.pace_ms))
            .with_progress_every(self.indexing.progress_every)
    }

    pub fn retrieval_options(&self) -> RetrievalOptions {
        self.retrieval.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = NotelensConfig::default();
        assert_eq!(config.chunking.chunk_size, 700);
        assert_eq!(config.chunking.overlap, 100);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.min_score, 0.7);
        assert_eq!(config.indexing.pace_ms, 100);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: NotelensConfig = toml::from_str(
            r#"
            [provider]
            base_url = "http://localhost:11434/v1"
            dimension = 768

            [retrieval]
            min_score = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(config.provider.dimension, 768);
        assert_eq!(config.provider.embedding_model, "text-embedding-3-small");
        assert_eq!(config.retrieval.min_score, 0.5);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.chunking.chunk_size, 700);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotelensConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 8);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "this is { not toml").unwrap();
        assert!(NotelensConfig::load(&path).is_err());
    }
}
