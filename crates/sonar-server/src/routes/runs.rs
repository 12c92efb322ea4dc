//! Run record endpoints.
//!
//! The pipeline itself only appends run rows; the one mutation exposed here
//! is the reviewer-facing "best answer" flag.

use axum::{Json, extract::Path, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Request body for the best-answer toggle.
#[derive(Debug, Deserialize)]
pub struct SetBestRequest {
    pub is_best: bool,
}

/// Response body for the best-answer toggle.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetBestResponse {
    pub id: String,
    pub is_best: bool,
}

/// POST /api/runs/{id}/best - toggle the reviewer flag on a run.
pub async fn set_best_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetBestRequest>,
) -> Result<Json<SetBestResponse>> {
    let updated = state.runs.set_best(&id, request.is_best)?;
    if !updated {
        return Err(ServerError::NotFound(format!("run '{}' not found", id)));
    }

    Ok(Json(SetBestResponse {
        id,
        is_best: request.is_best,
    }))
}
