//! notelens-retriever: incremental semantic note indexing and retrieval
//!
//! This crate keeps a persisted set of embedded text chunks consistent with
//! a changing collection of notes and answers natural-language questions by
//! retrieving the most relevant passages. Embedding and answer generation
//! are external services reached through the `notelens-provider` traits.
//!
//! ## Key Modules
//!
//! - **[`store`]**: SQLite-backed vector store and freshness ledger
//! - **[`retrieval`]**: reconciliation, retrieval, and query reformulation
//! - **[`config`]**: TOML configuration for the CLI and hosts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notelens_retriever::retrieval::indexer::{Indexer, IndexerConfig};
//! use notelens_retriever::retrieval::source::FsNotesSource;
//! use notelens_retriever::store::VectorStore;
//! use notelens_provider::{HttpEmbeddingClient, ProviderConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = VectorStore::open(std::path::Path::new(".")).await?;
//! let embedder = HttpEmbeddingClient::create(
//!     ProviderConfig::openai().with_env_api_key(),
//! )?;
//! let indexer = Indexer::new(store.clone(), Arc::new(embedder), IndexerConfig::default());
//!
//! let source = FsNotesSource::new("./notes");
//! let ledger = store.load_ledger().await?;
//! let outcome = indexer.reconcile(&source, ledger).await?;
//! store.save_ledger(&outcome.ledger).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! DocumentSource → Indexer → Chunker → EmbeddingProvider → VectorStore
//!                                                             ↓
//!      Question → Reformulator → ContextRetriever ← search ───┘
//! ```

pub mod config;
pub mod retrieval;
pub mod store;
