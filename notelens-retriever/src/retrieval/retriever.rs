//! Turns a question into an assembled context string.

use anyhow::Result;
use notelens_provider::EmbeddingProvider;
use std::sync::Arc;
use tracing::debug;

use crate::store::VectorStore;

/// Separator between retrieved chunk texts in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Tunables for one retrieval call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetrievalOptions {
    /// How many chunks to pull from the store before filtering.
    pub top_k: usize,
    /// Hits scoring below this are discarded.
    pub min_score: f32,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 8,
            min_score: 0.7,
        }
    }
}

impl RetrievalOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

/// Embeds queries and assembles context from the most similar chunks.
pub struct ContextRetriever {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ContextRetriever {
    pub fn new(store: VectorStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Retrieve context for `query`: embed, search, filter by score, join.
    ///
    /// An empty string means nothing cleared the threshold; that is a
    /// normal outcome, not an error. A failure embedding the query itself
    /// propagates.
    pub async fn retrieve(&self, query: &str, options: &RetrievalOptions) -> Result<String> {
        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&query_embedding, options.top_k).await?;

        let relevant: Vec<&str> = hits
            .iter()
            .filter(|hit| hit.score >= options.min_score)
            .map(|hit| hit.text.as_str())
            .collect();
        debug!(
            "retrieval kept {}/{} hits above {}",
            relevant.len(),
            hits.len(),
            options.min_score
        );

        Ok(relevant.join(CONTEXT_SEPARATOR))
    }
}

/// Prompt handed to the answer model: retrieved note context, then the
/// question, with an instruction to answer only from the supplied notes and
/// to name the source passages it leaned on.
pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Here are passages from a personal note collection:\n{context}\n\n\
         Analyze them and, without using any more external information, \
         provide a concise answer to the following question (mentioning \
         which passages the primary information came from):\n{question}"
    )
}
