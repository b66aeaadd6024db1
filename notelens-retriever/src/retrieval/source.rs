//! The document source seam: what the indexer reconciles against.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One document as seen by enumeration: its identity and freshness marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Unique identifier, stable across runs.
    pub path: String,
    /// Opaque freshness marker; only equality is meaningful.
    pub version: i64,
}

/// A mutable collection of text documents owned by someone else.
///
/// The core only reads. Enumeration order is not significant. Any failure
/// here is fatal to the reconcile call that triggered it.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Enumerate all documents with their current versions.
    async fn list_documents(&self) -> Result<Vec<DocumentMeta>>;

    /// Read the current text of one document.
    async fn read_text(&self, path: &str) -> Result<String>;
}

/// Filesystem-backed document source: a directory tree of notes, with
/// modification time (seconds) as the version marker.
#[derive(Debug, Clone)]
pub struct FsNotesSource {
    root: PathBuf,
}

impl FsNotesSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Note formats worth indexing; everything else in the tree is skipped.
    fn is_note(path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                return false;
            }
        }
        matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("md") | Some("markdown") | Some("txt")
        )
    }

    fn relative_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait]
impl DocumentSource for FsNotesSource {
    async fn list_documents(&self) -> Result<Vec<DocumentMeta>> {
        let mut documents = Vec::new();

        // Depth-first walk with an explicit stack.
        let mut dir_stack = vec![self.root.clone()];
        while let Some(current_dir) = dir_stack.pop() {
            let mut read_dir = tokio::fs::read_dir(&current_dir).await.map_err(|e| {
                anyhow::anyhow!("failed to read directory {}: {e}", current_dir.display())
            })?;

            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;

                if metadata.is_dir() {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        if name.starts_with('.') {
                            continue;
                        }
                    }
                    dir_stack.push(path);
                } else if metadata.is_file() && Self::is_note(&path) {
                    let version = metadata
                        .modified()?
                        .duration_since(std::time::UNIX_EPOCH)?
                        .as_secs() as i64;
                    documents.push(DocumentMeta {
                        path: self.relative_key(&path),
                        version,
                    });
                }
            }
        }

        Ok(documents)
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", full.display()))
    }
}
