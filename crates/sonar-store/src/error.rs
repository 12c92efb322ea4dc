//! Error types for the store crate.

use thiserror::Error;

/// Result type alias using the store error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem problem opening the database.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Row not found where one was required.
    #[error("Not found: {0}")]
    NotFound(String),
}
