//! HTTP server for the notice relay.
//!
//! The bot itself needs no inbound HTTP; this server only exposes status for
//! operators and liveness probes.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if server is running
//! - `GET /api/v1/branches` - Returns every branch's cursor and last run as JSON
//! - `GET /api/v1/branches/{branch}` - Returns one branch's status

use std::sync::Arc;

pub mod branches;
pub mod health;

pub use branches::{branch_handler, branches_handler};
pub use health::health_handler;

use crate::scheduler::StatusBoard;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Per-branch status written by the scheduler.
    status: StatusBoard,
}

impl AppState {
    pub fn new(status: StatusBoard) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { status }),
        }
    }

    pub fn status(&self) -> &StatusBoard {
        &self.inner.status
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/branches", get(branches_handler))
        .route("/api/v1/branches/{branch}", get(branch_handler))
        .with_state(app_state)
}
