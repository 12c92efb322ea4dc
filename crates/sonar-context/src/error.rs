//! Error types for context assembly.
//!
//! Only mode resolution can fail here; everything downstream of it degrades
//! instead of erroring.

use thiserror::Error;

/// Result type alias using the context error type.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised while resolving the retrieval mode.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The matched branch requires a user id the request did not carry.
    #[error("Workspace retrieval requires a user id")]
    MissingUserId,
}
