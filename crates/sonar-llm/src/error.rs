//! Error types for the LLM crate.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors from the model-provider layer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed against the provider.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network-level failure (includes timeouts).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider rejected the request for rate limiting.
    #[error("Rate limited: {0}")]
    RateLimit(String),

    /// Provider-side error response.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Failed to encode or decode a payload.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Network(e.to_string())
    }
}
