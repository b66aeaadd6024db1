//! # notelens-provider
//!
//! Call contracts for the external services the notelens core depends on:
//! an embedding service that turns text into fixed-length vectors, and an
//! answer-generation model that turns a prompt into prose. Both are treated
//! as replaceable black boxes behind narrow async traits; availability,
//! cost, and latency are their concern, not the core's.
//!
//! The concrete clients speak the OpenAI-compatible HTTP wire shape
//! (`/embeddings` and `/chat/completions`), which most hosted and local
//! serving stacks accept.
//!
//! ## Quick Start
//!
//! ```no_run
//! use notelens_provider::{EmbeddingProvider, HttpEmbeddingClient, ProviderConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProviderConfig::openai().with_api_key("sk-...");
//! let client = HttpEmbeddingClient::create(config)?;
//! let vector = client.embed("what did I write about lichen?").await?;
//! println!("{} dimensions", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`ProviderError`]
//! type. Transport failures, non-2xx API responses, and malformed bodies
//! are distinguished so callers can decide what is retryable.

pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;

pub use config::ProviderConfig;
pub use embedding::{EmbeddingProvider, HttpEmbeddingClient};
pub use error::{ProviderError, Result};
pub use generation::{ChatModel, HttpChatClient};
