//! End-to-end example demonstrating the complete indexing workflow
//!
//! This example shows how to:
//! 1. Create a small set of notes on disk
//! 2. Reconcile the vector store against them
//! 3. Run a semantic search and print the assembled context
//!
//! It talks to a real embedding endpoint, so it needs NOTELENS_API_KEY set
//! (and optionally a notelens.toml pointing at a local OpenAI-compatible
//! server instead of the hosted API).

use anyhow::Result;
use notelens_provider::{HttpEmbeddingClient, ProviderConfig};
use notelens_retriever::retrieval::indexer::{Indexer, IndexerConfig};
use notelens_retriever::retrieval::retriever::{ContextRetriever, RetrievalOptions};
use notelens_retriever::retrieval::source::FsNotesSource;
use notelens_retriever::store::VectorStore;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for better visibility
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let dir = tempdir()?;
    tokio::fs::write(
        dir.path().join("mushrooms.md"),
        "# Foraging log\n\nFound chanterelles near the north creek in July. \
         They prefer mossy ground under conifers.",
    )
    .await?;
    tokio::fs::write(
        dir.path().join("garden.md"),
        "# Garden plan\n\nTomatoes go in the south bed; basil between the rows \
         keeps the hornworms confused.",
    )
    .await?;

    println!("📁 Created sample notes at: {}", dir.path().display());

    let store = VectorStore::open(dir.path()).await?;
    let embedder = HttpEmbeddingClient::create(ProviderConfig::openai().with_env_api_key())?;
    let indexer = Indexer::new(
        store.clone(),
        Arc::new(embedder.clone()),
        IndexerConfig::default(),
    );

    println!("🔄 Reconciling the index...");
    let source = FsNotesSource::new(dir.path());
    let outcome = indexer.reconcile(&source, store.load_ledger().await?).await?;
    store.save_ledger(&outcome.ledger).await?;
    println!(
        "✅ Indexed {} documents, {} chunks",
        outcome.reports.len(),
        outcome.chunks_ok()
    );

    let retriever = ContextRetriever::new(store, Arc::new(embedder));
    let context = retriever
        .retrieve(
            "where do chanterelles grow?",
            &RetrievalOptions::default().with_min_score(0.2),
        )
        .await?;

    println!("\n🔍 Context for \"where do chanterelles grow?\":\n{context}");
    Ok(())
}
