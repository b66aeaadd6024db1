//! Pure text utilities for the notelens retrieval system.
//!
//! This crate holds the two dependency-free leaves of the pipeline:
//!
//! - [`chunk`]: splits raw note text into overlapping fixed-size windows,
//!   the unit of embedding and retrieval.
//! - [`similarity`]: cosine similarity between embedding vectors.
//!
//! Both are deterministic: chunking the same text twice with the same
//! parameters yields identical windows, which the indexer relies on for
//! idempotent rebuilds.

pub mod chunk;
pub mod similarity;

pub use chunk::{ChunkError, ChunkingConfig, chunk_text};
pub use similarity::{SimilarityError, cosine_similarity};
