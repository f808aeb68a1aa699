//! Per-branch pipeline status, shared with the HTTP status API.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cursor::Cursor;
use crate::types::{BranchId, NoticeId};

/// What the most recent pipeline run for a branch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// First observation; cursor set without notifying.
    Initialized,
    /// No new notices.
    Unchanged,
    /// New notices were fanned out.
    Delivered,
    /// The cursor was lost and reset to the newest notice.
    Reset,
    /// The source returned an empty listing.
    EmptyListing,
    /// The page could not be fetched.
    FetchFailed,
    /// The page was fetched but not understood.
    ParseFailed,
    /// The previous run was still in flight, so this tick was skipped.
    Skipped,
}

/// Status of one branch, as reported by `GET /api/v1/branches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchStatus {
    pub branch: BranchId,
    /// The cursor's notice ID, if set.
    pub cursor: Option<NoticeId>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<RunOutcome>,
    /// Messages delivered by the last run.
    pub delivered: usize,
    /// Messages that failed in the last run.
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl BranchStatus {
    fn new(branch: BranchId) -> Self {
        BranchStatus {
            branch,
            cursor: None,
            last_run_at: None,
            last_outcome: None,
            delivered: 0,
            failed: 0,
            last_error: None,
        }
    }
}

/// A finished (or skipped) pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub outcome: RunOutcome,
    pub cursor: Cursor,
    pub delivered: usize,
    pub failed: usize,
    pub error: Option<String>,
}

/// Shared, cloneable view of every branch's latest run.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BTreeMap<BranchId, BranchStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result of a run for `branch`.
    pub fn record(&self, branch: &BranchId, record: RunRecord) {
        // A poisoned lock still holds usable status data.
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let status = map
            .entry(branch.clone())
            .or_insert_with(|| BranchStatus::new(branch.clone()));
        status.cursor = record.cursor.notice_id();
        status.last_run_at = Some(Utc::now());
        status.last_outcome = Some(record.outcome);
        status.delivered = record.delivered;
        status.failed = record.failed;
        status.last_error = record.error;
    }

    /// Notes that a tick skipped `branch`, keeping the previous counters.
    pub fn record_skipped(&self, branch: &BranchId) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let status = map
            .entry(branch.clone())
            .or_insert_with(|| BranchStatus::new(branch.clone()));
        status.last_outcome = Some(RunOutcome::Skipped);
    }

    pub fn get(&self, branch: &BranchId) -> Option<BranchStatus> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(branch).cloned()
    }

    /// Every branch's status, sorted by branch.
    pub fn snapshot(&self) -> Vec<BranchStatus> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.values().cloned().collect()
    }
}
