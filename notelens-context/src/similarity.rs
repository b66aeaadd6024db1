//! Cosine similarity between embedding vectors.

/// Errors from scorer misuse.
#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    /// The two vectors came from different embedding spaces.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// Zero-magnitude input has no defined angle; the scorer returns 0.0
/// rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
