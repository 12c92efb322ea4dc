//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Context assembly failed fatally (mode resolution).
    #[error("Context error: {0}")]
    Context(#[from] sonar_context::ContextError),

    /// Model provider error before streaming began.
    #[error("Model error: {0}")]
    Llm(#[from] sonar_llm::LlmError),

    /// Database/storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] sonar_store::StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            // Mode-resolution failures are surfaced as server errors with
            // detail, matching the dashboard's existing client handling.
            ServerError::Context(_) => (StatusCode::INTERNAL_SERVER_ERROR, "context_error"),
            ServerError::Llm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            ServerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        match &self {
            ServerError::BadRequest(_) | ServerError::NotFound(_) => {
                tracing::warn!(status = %status, code, error = %message, "Client error");
            }
            _ => {
                tracing::error!(status = %status, code, error = %message, "Server error");
            }
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
