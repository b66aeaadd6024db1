//! SQLite implementation of the vector store.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE chunks (
//!     id TEXT PRIMARY KEY,             -- "{source_path}::{chunk_index}"
//!     source_path TEXT,                -- secondary, non-unique index
//!     chunk_index INTEGER,
//!     content TEXT,
//!     embedding BLOB,                  -- f32 vector
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! CREATE TABLE ledger (
//!     path TEXT PRIMARY KEY,
//!     version INTEGER,
//!     indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Every mutation is a single statement or transaction, so a search running
//! concurrently with a reconcile never observes a half-written chunk or a
//! half-deleted document chunk set. Search itself is a brute-force cosine
//! scan: corpora here are personal-note scale (thousands of chunks, not
//! millions), and the method signature leaves room to swap in an
//! approximate index without touching callers.

use anyhow::Result;
use notelens_context::similarity::cosine_similarity;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use super::{EmbeddedChunk, FreshnessLedger, SearchHit, StoreStats, chunk_id};

/// SQLite-backed store for embedded chunks and the freshness ledger.
#[derive(Clone, Debug)]
pub struct VectorStore {
    base: PathBuf,
    pool: SqlitePool,
}

impl VectorStore {
    /// Opens the store with persistent SQLite storage under `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join(".notelens.db");

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(base, pool).await
    }

    /// Opens the store with in-memory SQLite storage, for tests.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(Path::new("."), pool).await
    }

    async fn new_with_pool(base: &Path, pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self {
            base: base.to_path_buf(),
            pool,
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_path TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger (
                path TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_path)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Upserts one chunk by id. Readable by `get_all`/`search` as soon as
    /// this returns.
    pub async fn put(&self, chunk: &EmbeddedChunk) -> Result<()> {
        // Validate at the store boundary rather than trusting callers.
        if chunk.id != chunk_id(&chunk.source_path, chunk.chunk_index) {
            anyhow::bail!(
                "chunk id {:?} does not match source {:?} index {}",
                chunk.id,
                chunk.source_path,
                chunk.chunk_index
            );
        }
        if chunk.embedding.is_empty() {
            anyhow::bail!("refusing to store chunk {:?} with empty embedding", chunk.id);
        }

        let embedding_bytes = bytemuck::cast_slice::<f32, u8>(&chunk.embedding);

        sqlx::query(
            r#"
            INSERT INTO chunks (id, source_path, chunk_index, content, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                source_path = excluded.source_path,
                chunk_index = excluded.chunk_index,
                content = excluded.content,
                embedding = excluded.embedding
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_path)
        .bind(chunk.chunk_index as i64)
        .bind(&chunk.text)
        .bind(embedding_bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Full scan of all stored chunks, ordered by source path and position.
    pub async fn get_all(&self) -> Result<Vec<EmbeddedChunk>> {
        let rows = sqlx::query(
            "SELECT id, source_path, chunk_index, content, embedding
             FROM chunks ORDER BY source_path, chunk_index",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_chunk).collect()
    }

    /// Deletes every chunk belonging to `source_path`. Deleting a document
    /// with no chunks is a no-op, not an error.
    pub async fn remove_by_document(&self, source_path: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_path = ?1")
            .bind(source_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    /// Deletes all chunks. Destructive; meant for explicit reset flows only
    /// and never called automatically.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        sqlx::query("DELETE FROM ledger").execute(&self.pool).await?;
        Ok(())
    }

    /// Scores every stored chunk against `query` and returns the `top_k`
    /// best, descending by score. Ties keep insertion order, so results are
    /// deterministic. Returns fewer than `top_k` hits when the store is
    /// smaller than that.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query(
            "SELECT source_path, content, embedding FROM chunks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let source_path: String = row.get("source_path");
            let content: String = row.get("content");
            let embedding = decode_embedding(row.get("embedding"))?;

            let score = cosine_similarity(query, &embedding)?;
            scored.push(SearchHit {
                text: content,
                source_path,
                score,
            });
        }

        // Stable sort: equal scores keep rowid order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Reads the persisted freshness ledger.
    pub async fn load_ledger(&self) -> Result<FreshnessLedger> {
        let rows = sqlx::query("SELECT path, version FROM ledger")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("path"), row.get::<i64, _>("version")))
            .collect())
    }

    /// Replaces the persisted ledger with `ledger` in one transaction.
    /// Called by the host after a successful reconcile; the reconciler
    /// itself never writes here.
    pub async fn save_ledger(&self, ledger: &FreshnessLedger) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ledger").execute(&mut *tx).await?;
        for (path, version) in ledger.iter() {
            sqlx::query(
                "INSERT INTO ledger (path, version, indexed_at) VALUES (?1, ?2, datetime('now'))",
            )
            .bind(path)
            .bind(version)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts over the persisted state.
    pub async fn stats(&self) -> Result<StoreStats> {
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let tracked_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            chunks: chunks as usize,
            tracked_documents: tracked_documents as usize,
        })
    }

    /// Directory holding the database file.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The underlying SQLite connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_chunk(row: sqlx::sqlite::SqliteRow) -> Result<EmbeddedChunk> {
    let id: String = row.get("id");
    let source_path: String = row.get("source_path");
    let chunk_index: i64 = row.get("chunk_index");
    let content: String = row.get("content");
    let embedding = decode_embedding(row.get("embedding"))?;

    Ok(EmbeddedChunk {
        id,
        source_path,
        chunk_index: chunk_index as usize,
        text: content,
        embedding,
    })
}

fn decode_embedding(bytes: Vec<u8>) -> Result<Vec<f32>> {
    if bytes.len() % std::mem::size_of::<f32>() != 0 {
        anyhow::bail!("embedding blob of {} bytes is not a whole f32 vector", bytes.len());
    }
    // pod_collect_to_vec copies, so the blob's alignment does not matter.
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, index: usize, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk::new(path, index, text, embedding)
    }

    #[tokio::test]
    async fn put_then_get_all_round_trips() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        store.put(&chunk("notes/a.md", 0, "first", vec![0.1, 0.2, 0.3])).await?;
        store.put(&chunk("notes/a.md", 1, "second", vec![0.4, 0.5, 0.6])).await?;

        let all = store.get_all().await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "notes/a.md::0");
        assert_eq!(all[0].text, "first");
        assert_eq!(all[0].embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(all[1].chunk_index, 1);

        Ok(())
    }

    #[tokio::test]
    async fn put_is_an_upsert_by_id() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        store.put(&chunk("notes/a.md", 0, "old text", vec![0.1, 0.2])).await?;
        store.put(&chunk("notes/a.md", 0, "new text", vec![0.3, 0.4])).await?;

        let all = store.get_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "new text");
        assert_eq!(all[0].embedding, vec![0.3, 0.4]);

        Ok(())
    }

    #[tokio::test]
    async fn store_rejects_inconsistent_chunks() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        let mut bad_id = chunk("notes/a.md", 0, "text", vec![0.1]);
        bad_id.id = "notes/b.md::7".to_string();
        assert!(store.put(&bad_id).await.is_err());

        let empty = chunk("notes/a.md", 0, "text", vec![]);
        assert!(store.put(&empty).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn remove_by_document_only_touches_that_path() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        store.put(&chunk("notes/a.md", 0, "a0", vec![0.1])).await?;
        store.put(&chunk("notes/a.md", 1, "a1", vec![0.2])).await?;
        store.put(&chunk("notes/b.md", 0, "b0", vec![0.3])).await?;

        let removed = store.remove_by_document("notes/a.md").await?;
        assert_eq!(removed, 2);

        let all = store.get_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].source_path, "notes/b.md");

        // Removing a path with no chunks is a no-op, not an error.
        assert_eq!(store.remove_by_document("notes/a.md").await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn search_returns_top_k_in_descending_score_order() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        // Unit vectors at known angles to the query (1, 0).
        store.put(&chunk("n/a.md", 0, "same direction", vec![1.0, 0.0])).await?;
        store.put(&chunk("n/b.md", 0, "orthogonal", vec![0.0, 1.0])).await?;
        store.put(&chunk("n/c.md", 0, "opposite", vec![-1.0, 0.0])).await?;
        store.put(&chunk("n/d.md", 0, "diagonal", vec![1.0, 1.0])).await?;

        let hits = store.search(&[1.0, 0.0], 3).await?;
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "same direction");
        assert_eq!(hits[1].text, "diagonal");
        assert_eq!(hits[2].text, "orthogonal");
        assert!(hits[0].score > hits[1].score && hits[1].score > hits[2].score);

        // Never more hits than stored chunks.
        let hits = store.search(&[1.0, 0.0], 100).await?;
        assert_eq!(hits.len(), 4);

        Ok(())
    }

    #[tokio::test]
    async fn search_dimension_mismatch_is_an_error() -> Result<()> {
        let store = VectorStore::open_memory().await?;
        store.put(&chunk("n/a.md", 0, "text", vec![0.1, 0.2, 0.3])).await?;

        assert!(store.search(&[1.0, 0.0], 5).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn ledger_save_load_round_trips() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        let mut ledger = FreshnessLedger::default();
        ledger.record("notes/a.md", 100);
        ledger.record("notes/b.md", 250);
        store.save_ledger(&ledger).await?;

        assert_eq!(store.load_ledger().await?, ledger);

        // Saving again after a removal prunes the dropped path.
        ledger.forget("notes/a.md");
        store.save_ledger(&ledger).await?;
        let reloaded = store.load_ledger().await?;
        assert_eq!(reloaded.len(), 1);
        assert!(!reloaded.contains("notes/a.md"));

        Ok(())
    }

    #[tokio::test]
    async fn clear_wipes_chunks_and_ledger() -> Result<()> {
        let store = VectorStore::open_memory().await?;

        store.put(&chunk("notes/a.md", 0, "text", vec![0.1])).await?;
        let mut ledger = FreshnessLedger::default();
        ledger.record("notes/a.md", 1);
        store.save_ledger(&ledger).await?;

        store.clear().await?;

        let stats = store.stats().await?;
        assert_eq!(stats.chunks, 0);
        assert_eq!(stats.tracked_documents, 0);

        Ok(())
    }
}
