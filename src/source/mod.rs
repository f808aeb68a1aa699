//! Notice sources: fetching and parsing the notice board for one branch.
//!
//! The board has no ETag or last-modified contract, so every call performs a fresh
//! fetch and parse. Results are scoped to exactly one branch and ordered newest first.
//!
//! - [`html`]: pure extraction of notices from the listing page
//! - [`ims`]: the HTTP-backed source that submits the branch selector

use std::future::Future;

use thiserror::Error;

use crate::types::{BranchId, Notice};

pub mod html;
pub mod ims;

pub use html::parse_listing;
pub use ims::{DEFAULT_BRANCH_FIELD, DEFAULT_SOURCE_URL, ImsSource};

/// Errors from fetching or parsing a listing.
///
/// Both are non-fatal: the branch pipeline logs them and leaves the cursor untouched,
/// so the next tick retries naturally.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or a non-success HTTP status.
    #[error("fetch failed: {message}")]
    Fetch {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The page did not have the expected structure.
    #[error("parse failed: {0}")]
    Parse(String),
}

impl SourceError {
    pub fn fetch(message: impl Into<String>) -> Self {
        SourceError::Fetch {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, SourceError::Parse(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Fetch {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Fetches the current listing for a branch.
pub trait NoticeSource: Send + Sync {
    /// Returns the branch's notices, newest first.
    fn fetch(
        &self,
        branch: &BranchId,
    ) -> impl Future<Output = Result<Vec<Notice>, SourceError>> + Send;
}
