//! Branch status endpoints for observability.
//!
//! Provides a read-only view of each branch's cursor and most recent pipeline run.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::AppState;
use crate::scheduler::BranchStatus;
use crate::types::BranchId;

/// Errors that can occur when fetching branch status.
#[derive(Debug, Error)]
pub enum BranchStatusError {
    /// The branch has never been scheduled.
    #[error("branch not found: {0}")]
    NotFound(String),

    #[error("invalid branch name")]
    InvalidBranch,
}

impl IntoResponse for BranchStatusError {
    fn into_response(self) -> Response {
        let status = match &self {
            BranchStatusError::NotFound(_) => StatusCode::NOT_FOUND,
            BranchStatusError::InvalidBranch => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Lists every scheduled branch.
///
/// # Example
///
/// ```ignore
/// GET /api/v1/branches HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// [
///   {
///     "branch": "CSE",
///     "cursor": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
///     "last_run_at": "2025-01-15T12:00:00Z",
///     "last_outcome": "delivered",
///     "delivered": 4,
///     "failed": 0
///   }
/// ]
/// ```
pub async fn branches_handler(State(app_state): State<AppState>) -> Json<Vec<BranchStatus>> {
    Json(app_state.status().snapshot())
}

/// Returns one branch's status, or 404 if the branch has never been scheduled.
pub async fn branch_handler(
    State(app_state): State<AppState>,
    Path(branch): Path<String>,
) -> Result<Json<BranchStatus>, BranchStatusError> {
    let id = BranchId::parse(&branch).map_err(|_| BranchStatusError::InvalidBranch)?;
    app_state
        .status()
        .get(&id)
        .map(Json)
        .ok_or(BranchStatusError::NotFound(branch))
}
