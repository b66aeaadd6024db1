//! Persistence layer: embedded chunks and the freshness ledger.
//!
//! Two logical tables live side by side in one SQLite database:
//!
//! - **chunks**: embedded text chunks keyed by a deterministic
//!   `"{path}::{index}"` id, with a secondary index on the source path so a
//!   document's whole chunk set can be dropped in one statement.
//! - **ledger**: which version of each document was last indexed. The
//!   reconciler reads and returns ledgers as plain values; only the host
//!   writes the table, after a reconcile succeeds.

use std::collections::HashMap;

pub mod vector_store;

pub use vector_store::VectorStore;

/// Build the deterministic chunk id for a document path and chunk position.
pub fn chunk_id(source_path: &str, chunk_index: usize) -> String {
    format!("{source_path}::{chunk_index}")
}

/// One embedded text chunk, the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    /// Deterministic composite of `source_path` and `chunk_index`.
    pub id: String,
    /// Path of the document this chunk was cut from.
    pub source_path: String,
    /// Zero-based position of this chunk within its document.
    pub chunk_index: usize,
    /// The chunk text as it read at index time.
    pub text: String,
    /// Embedding vector; dimensionality is fixed by the embedding service.
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(
        source_path: impl Into<String>,
        chunk_index: usize,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let source_path = source_path.into();
        Self {
            id: chunk_id(&source_path, chunk_index),
            source_path,
            chunk_index,
            text: text.into(),
            embedding,
        }
    }
}

/// One similarity-search result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub text: String,
    pub source_path: String,
    pub score: f32,
}

/// Counts over the persisted state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub chunks: usize,
    pub tracked_documents: usize,
}

/// Mapping from document path to the version last indexed.
///
/// Absence of an entry means "never indexed". Only equality of versions is
/// meaningful; the marker is opaque (a modification time in practice).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreshnessLedger {
    entries: HashMap<String, i64>,
}

impl FreshnessLedger {
    pub fn version_of(&self, path: &str) -> Option<i64> {
        self.entries.get(path).copied()
    }

    pub fn record(&mut self, path: impl Into<String>, version: i64) {
        self.entries.insert(path.into(), version);
    }

    pub fn forget(&mut self, path: &str) -> Option<i64> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Tracked paths, cloned so the ledger can be mutated while iterating.
    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(path, v)| (path.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, i64)> for FreshnessLedger {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
