//! Error types for provider calls.

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure of an embedding or generation call.
///
/// Provider failures are recoverable from the core's point of view: a
/// failed chunk embedding is skipped and reported, a failed reformulation
/// falls back to a heuristic. The variants separate what the caller may
/// want to retry (transport, quota) from what it should not (a request the
/// server rejected as malformed).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key was configured for a provider that requires one.
    #[error("no API key configured (set {env_hint})")]
    MissingApiKey { env_hint: String },

    /// Transport-level failure before a response arrived.
    #[error("provider request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response arrived but did not have the promised shape.
    #[error("malformed provider response: {message}")]
    MalformedResponse { message: String },

    /// Generic errors from other libraries.
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl ProviderError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}
