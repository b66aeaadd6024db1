//! Reconciles the vector store against the live document source.
//!
//! `reconcile` is a pure function of its inputs plus store side effects: it
//! takes the previous freshness ledger as a value and returns the updated
//! one for the caller to persist. Documents are rebuilt strictly
//! sequentially, one embedding call at a time, to bound external rate-limit
//! pressure and keep store writes trivially ordered. Concurrent reconciles
//! are not supported; callers serialize them.

use anyhow::Result;
use notelens_context::chunk::{ChunkingConfig, chunk_text};
use notelens_provider::EmbeddingProvider;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::source::DocumentSource;
use crate::store::{EmbeddedChunk, FreshnessLedger, VectorStore, chunk_id};

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Window geometry for chunking document text.
    pub chunking: ChunkingConfig,
    /// Delay between consecutive embedding calls. Zero disables pacing,
    /// which tests rely on to run without wall-clock waits.
    pub pace: Duration,
    /// Emit a progress event after every this many rebuilt documents.
    pub progress_every: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            pace: Duration::from_millis(100),
            progress_every: 10,
        }
    }
}

impl IndexerConfig {
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_pacing(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_progress_every(mut self, progress_every: usize) -> Self {
        self.progress_every = progress_every.max(1);
        self
    }
}

/// Human-relevant notifications emitted while reconciling. Delivery beyond
/// the log (toast, status bar) is the caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    /// A previously indexed document disappeared and its chunks were dropped.
    DocumentRemoved { path: String },
    /// Periodic rebuild progress.
    Progress { indexed: usize, total: usize },
    /// One chunk could not be embedded and was skipped.
    ChunkFailed { chunk_id: String, message: String },
    /// Final tally for the reconcile call.
    Summary {
        indexed: usize,
        removed: usize,
        chunks_ok: usize,
        chunks_failed: usize,
    },
}

/// Outcome of rebuilding one document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub path: String,
    pub version: i64,
    pub chunks_ok: usize,
    pub chunks_failed: usize,
}

/// What a reconcile call did. The caller persists `ledger`; the reconciler
/// never writes it back itself.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub ledger: FreshnessLedger,
    /// Paths whose chunk sets were dropped because the document vanished.
    pub removed: Vec<String>,
    /// One report per rebuilt document.
    pub reports: Vec<DocumentReport>,
}

impl ReconcileOutcome {
    pub fn chunks_ok(&self) -> usize {
        self.reports.iter().map(|r| r.chunks_ok).sum()
    }

    pub fn chunks_failed(&self) -> usize {
        self.reports.iter().map(|r| r.chunks_failed).sum()
    }
}

/// Brings the vector store in line with the current document set.
pub struct Indexer {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
    config: IndexerConfig,
    events: Option<mpsc::UnboundedSender<IndexEvent>>,
}

impl Indexer {
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            events: None,
        }
    }

    /// Forward [`IndexEvent`]s to `sender` in addition to the log.
    pub fn with_event_sink(mut self, sender: mpsc::UnboundedSender<IndexEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    fn notify(&self, event: IndexEvent) {
        if let Some(sender) = &self.events {
            // A closed sink only means nobody is listening anymore.
            let _ = sender.send(event);
        }
    }

    /// Detect added, modified, and deleted documents and bring the store up
    /// to date.
    ///
    /// A failure listing documents aborts before any mutation. A failure
    /// reading one document's text aborts the call; since the caller only
    /// persists the returned ledger on success, a failed run never advances
    /// the persisted ledger. Embedding failures are scoped to the single
    /// chunk: the chunk is skipped, reported, and its siblings still index.
    ///
    /// A document is marked current once all its chunks have been
    /// *attempted* — even if some failed — so it will not be revisited until
    /// its version changes. The gap is visible in the returned
    /// [`DocumentReport`]s; callers that want a retry can `forget` the
    /// ledger entry.
    pub async fn reconcile(
        &self,
        source: &dyn DocumentSource,
        mut ledger: FreshnessLedger,
    ) -> Result<ReconcileOutcome> {
        let documents = source.list_documents().await?;
        let current_paths: HashSet<&str> = documents.iter().map(|d| d.path.as_str()).collect();

        // Deletions first: drop chunk sets for documents that vanished.
        let mut removed = Vec::new();
        for path in ledger.paths() {
            if !current_paths.contains(path.as_str()) {
                self.store.remove_by_document(&path).await?;
                ledger.forget(&path);
                info!("removed deleted document: {path}");
                self.notify(IndexEvent::DocumentRemoved { path: path.clone() });
                removed.push(path);
            }
        }

        // A document is stale when never indexed or when its version moved.
        let stale: Vec<_> = documents
            .iter()
            .filter(|d| ledger.version_of(&d.path) != Some(d.version))
            .collect();

        if stale.is_empty() {
            info!("index is already up to date ({} documents)", documents.len());
            self.notify(IndexEvent::Summary {
                indexed: 0,
                removed: removed.len(),
                chunks_ok: 0,
                chunks_failed: 0,
            });
            return Ok(ReconcileOutcome {
                ledger,
                removed,
                reports: Vec::new(),
            });
        }

        info!("indexing {} stale documents", stale.len());

        let mut reports = Vec::new();
        for (position, document) in stale.iter().enumerate() {
            // Replace the whole chunk set so the store never mixes chunk
            // sets from two versions of one document.
            self.store.remove_by_document(&document.path).await?;

            let text = source.read_text(&document.path).await?;
            let chunks = chunk_text(&text, &self.config.chunking)?;
            debug!("{}: {} chunks", document.path, chunks.len());

            let mut chunks_ok = 0;
            let mut chunks_failed = 0;
            for (index, chunk) in chunks.iter().enumerate() {
                match self.embedder.embed(chunk).await {
                    Ok(embedding) => {
                        let record =
                            EmbeddedChunk::new(document.path.clone(), index, chunk.clone(), embedding);
                        self.store.put(&record).await?;
                        chunks_ok += 1;

                        if !self.config.pace.is_zero() {
                            tokio::time::sleep(self.config.pace).await;
                        }
                    }
                    Err(e) => {
                        chunks_failed += 1;
                        let id = chunk_id(&document.path, index);
                        warn!("failed to embed {id}: {e}");
                        self.notify(IndexEvent::ChunkFailed {
                            chunk_id: id,
                            message: e.to_string(),
                        });
                    }
                }
            }

            // All chunks attempted: the document counts as indexed at this
            // version, failed chunks included.
            ledger.record(document.path.clone(), document.version);
            reports.push(DocumentReport {
                path: document.path.clone(),
                version: document.version,
                chunks_ok,
                chunks_failed,
            });

            if (position + 1) % self.config.progress_every == 0 {
                info!("indexed {}/{} documents", position + 1, stale.len());
                self.notify(IndexEvent::Progress {
                    indexed: position + 1,
                    total: stale.len(),
                });
            }
        }

        let outcome = ReconcileOutcome {
            ledger,
            removed,
            reports,
        };
        info!(
            "reconcile complete: {} documents rebuilt, {} removed, {} chunks ok, {} failed",
            outcome.reports.len(),
            outcome.removed.len(),
            outcome.chunks_ok(),
            outcome.chunks_failed()
        );
        self.notify(IndexEvent::Summary {
            indexed: outcome.reports.len(),
            removed: outcome.removed.len(),
            chunks_ok: outcome.chunks_ok(),
            chunks_failed: outcome.chunks_failed(),
        });
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::source::DocumentMeta;
    use async_trait::async_trait;
    use notelens_provider::{ProviderError, Result as ProviderResult};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Deterministic embedder: folds bytes into a small fixed-size vector.
    struct HashEmbedder;

    fn fold_embedding(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 4];
        for (i, byte) in text.bytes().enumerate() {
            v[i % 4] += byte as f32 / 255.0;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedder {
        async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
            Ok(fold_embedding(text))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn provider_name(&self) -> &str {
            "hash-embedder"
        }
    }

    /// Embedder that rejects chunks containing a marker substring.
    struct FlakyEmbedder {
        poison: &'static str,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
            if text.contains(self.poison) {
                return Err(ProviderError::api(429, "rate limited"));
            }
            Ok(fold_embedding(text))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn provider_name(&self) -> &str {
            "flaky-embedder"
        }
    }

    /// In-memory document source.
    #[derive(Default)]
    struct MapSource {
        docs: Mutex<HashMap<String, (i64, String)>>,
    }

    impl MapSource {
        fn set(&self, path: &str, version: i64, text: &str) {
            self.docs
                .lock()
                .unwrap()
                .insert(path.to_string(), (version, text.to_string()));
        }

        fn delete(&self, path: &str) {
            self.docs.lock().unwrap().remove(path);
        }
    }

    #[async_trait]
    impl DocumentSource for MapSource {
        async fn list_documents(&self) -> Result<Vec<DocumentMeta>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .iter()
                .map(|(path, (version, _))| DocumentMeta {
                    path: path.clone(),
                    version: *version,
                })
                .collect())
        }

        async fn read_text(&self, path: &str) -> Result<String> {
            self.docs
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, text)| text.clone())
                .ok_or_else(|| anyhow::anyhow!("no such document: {path}"))
        }
    }

    /// Source whose enumeration always fails.
    struct BrokenSource;

    #[async_trait]
    impl DocumentSource for BrokenSource {
        async fn list_documents(&self) -> Result<Vec<DocumentMeta>> {
            anyhow::bail!("document source unavailable")
        }

        async fn read_text(&self, _path: &str) -> Result<String> {
            anyhow::bail!("document source unavailable")
        }
    }

    fn test_indexer(store: VectorStore) -> Indexer {
        Indexer::new(
            store,
            Arc::new(HashEmbedder),
            IndexerConfig::default().with_pacing(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn first_reconcile_indexes_everything() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = test_indexer(store.clone());

        let source = MapSource::default();
        source.set("notes/a.md", 1, &"alpha ".repeat(200));
        source.set("notes/b.md", 1, "short note");

        let outcome = indexer.reconcile(&source, FreshnessLedger::default()).await?;

        assert_eq!(outcome.ledger.version_of("notes/a.md"), Some(1));
        assert_eq!(outcome.ledger.version_of("notes/b.md"), Some(1));
        assert_eq!(outcome.chunks_failed(), 0);
        assert_eq!(store.get_all().await?.len(), outcome.chunks_ok());
        Ok(())
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_when_nothing_changed() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = test_indexer(store.clone());

        let source = MapSource::default();
        source.set("notes/a.md", 7, "some stable text");

        let first = indexer.reconcile(&source, FreshnessLedger::default()).await?;
        let after_first = store.get_all().await?;

        let second = indexer.reconcile(&source, first.ledger.clone()).await?;
        let after_second = store.get_all().await?;

        assert_eq!(second.reports.len(), 0);
        assert_eq!(second.ledger, first.ledger);
        assert_eq!(after_second, after_first);
        Ok(())
    }

    #[tokio::test]
    async fn version_bump_replaces_the_chunk_set() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = test_indexer(store.clone());

        let source = MapSource::default();
        source.set("notes/a.md", 1, &"old content ".repeat(100));

        let outcome = indexer.reconcile(&source, FreshnessLedger::default()).await?;
        let old_chunks = store.get_all().await?;
        assert!(!old_chunks.is_empty());

        source.set("notes/a.md", 2, "entirely new content");
        let outcome = indexer.reconcile(&source, outcome.ledger).await?;

        assert_eq!(outcome.ledger.version_of("notes/a.md"), Some(2));
        let new_chunks = store.get_all().await?;
        assert_eq!(new_chunks.len(), 1);
        assert_eq!(new_chunks[0].text, "entirely new content");
        Ok(())
    }

    #[tokio::test]
    async fn deleted_documents_lose_chunks_and_ledger_entry() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = test_indexer(store.clone());

        let source = MapSource::default();
        source.set("notes/keep.md", 1, "keep me");
        source.set("notes/drop.md", 1, "drop me");

        let outcome = indexer.reconcile(&source, FreshnessLedger::default()).await?;

        source.delete("notes/drop.md");
        let outcome = indexer.reconcile(&source, outcome.ledger).await?;

        assert_eq!(outcome.removed, vec!["notes/drop.md".to_string()]);
        assert!(!outcome.ledger.contains("notes/drop.md"));
        assert!(
            store
                .get_all()
                .await?
                .iter()
                .all(|c| c.source_path != "notes/drop.md")
        );
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn one_bad_chunk_does_not_abort_the_document() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = Indexer::new(
            store.clone(),
            Arc::new(FlakyEmbedder { poison: "POISON" }),
            IndexerConfig::default()
                .with_pacing(Duration::ZERO)
                .with_chunking(ChunkingConfig::new(20, 0)),
        );

        // Second window carries the poison marker; first and third are fine.
        let text = format!("{}{}{}", "a".repeat(20), "bbbbbbbbbbbbbbPOISON", "c".repeat(20));
        let source = MapSource::default();
        source.set("notes/a.md", 1, &text);

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let indexer = indexer.with_event_sink(sender);
        let outcome = indexer.reconcile(&source, FreshnessLedger::default()).await?;

        // Document is still marked current, with the gap on the record.
        assert_eq!(outcome.ledger.version_of("notes/a.md"), Some(1));
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].chunks_ok, 2);
        assert_eq!(outcome.reports[0].chunks_failed, 1);
        assert_eq!(store.get_all().await?.len(), 2);
        assert!(logs_contain("failed to embed notes/a.md::1"));

        let mut saw_chunk_failed = false;
        while let Ok(event) = receiver.try_recv() {
            if let IndexEvent::ChunkFailed { chunk_id, .. } = event {
                assert_eq!(chunk_id, "notes/a.md::1");
                saw_chunk_failed = true;
            }
        }
        assert!(saw_chunk_failed);
        Ok(())
    }

    #[tokio::test]
    async fn enumeration_failure_leaves_store_and_ledger_untouched() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let indexer = test_indexer(store.clone());

        let source = MapSource::default();
        source.set("notes/a.md", 1, "text");
        let outcome = indexer.reconcile(&source, FreshnessLedger::default()).await?;
        let chunks_before = store.get_all().await?;

        let result = indexer.reconcile(&BrokenSource, outcome.ledger).await;
        assert!(result.is_err());
        assert_eq!(store.get_all().await?, chunks_before);
        Ok(())
    }

    #[tokio::test]
    async fn progress_events_fire_on_the_configured_cadence() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let indexer = Indexer::new(
            store,
            Arc::new(HashEmbedder),
            IndexerConfig::default()
                .with_pacing(Duration::ZERO)
                .with_progress_every(2),
        )
        .with_event_sink(sender);

        let source = MapSource::default();
        for i in 0..5 {
            source.set(&format!("notes/{i}.md"), 1, "tiny");
        }

        indexer.reconcile(&source, FreshnessLedger::default()).await?;

        let mut progress = Vec::new();
        let mut summaries = 0;
        while let Ok(event) = receiver.try_recv() {
            match event {
                IndexEvent::Progress { indexed, total } => progress.push((indexed, total)),
                IndexEvent::Summary { indexed, .. } => {
                    summaries += 1;
                    assert_eq!(indexed, 5);
                }
                _ => {}
            }
        }
        assert_eq!(progress, vec![(2, 5), (4, 5)]);
        assert_eq!(summaries, 1);
        Ok(())
    }
}
