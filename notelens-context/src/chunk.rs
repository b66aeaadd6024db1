//! Sliding-window text chunking.
//!
//! Notes are split into overlapping windows of a fixed character length so
//! that a sentence falling on a boundary still appears whole in at least one
//! window. The window advances by `chunk_size - overlap` each step, starting
//! at offset 0 and stopping once the window start reaches the end of the
//! text; the final window may be shorter than `chunk_size`.
//!
//! Chunking is pure: no IO, no configuration lookup, and identical input
//! always produces identical output.

use serde::{Deserialize, Serialize};

/// Errors from invalid chunking parameters.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The window geometry can never terminate or produce output.
    #[error("invalid chunking configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ChunkError {
    fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Configuration for the window chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows. Must be smaller than
    /// `chunk_size`, otherwise the window could not advance.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 700,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// The distance the window start moves each step.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Reject geometry that would loop forever or emit empty windows.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::invalid("chunk_size must be positive"));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::invalid(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split `text` into overlapping windows according to `config`.
///
/// Returns windows in document order. Empty input yields no windows. Window
/// edges are snapped down to UTF-8 character boundaries, so multi-byte text
/// never splits a character; for ASCII input the windows are byte-exact.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ChunkError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let window_start = floor_char_boundary(text, start);
        let window_end = floor_char_boundary(text, (start + config.chunk_size).min(text.len()));
        if window_end > window_start {
            chunks.push(text[window_start..window_end].to_string());
        }
        start += config.step();
    }
    Ok(chunks)
}

/// Largest index `<= at` that lands on a char boundary.
fn floor_char_boundary(text: &str, mut at: usize) -> usize {
    while at > 0 && !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}
