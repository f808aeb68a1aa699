//! Per-branch cursors.
//!
//! A cursor records the newest notice already delivered for a branch. Cursors live in
//! memory for the lifetime of the process and are never deleted.
//!
//! # Ownership
//!
//! Each branch gets one slot, a `tokio::sync::Mutex<Cursor>`. A branch pipeline claims
//! the slot for its whole run (fetch, diff, fanout), so two diffs for the same branch
//! can never interleave. If a slot is still claimed when the next tick comes round, the
//! claim fails and that branch is skipped for the tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::{BranchId, NoticeId};

/// Position of a branch in its notice stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// The branch has never been scraped successfully.
    #[default]
    Unset,
    /// The newest notice already seen for the branch.
    At(NoticeId),
}

impl Cursor {
    pub fn notice_id(&self) -> Option<NoticeId> {
        match self {
            Cursor::Unset => None,
            Cursor::At(id) => Some(*id),
        }
    }
}

/// Exclusive access to one branch's cursor, held for a single pipeline run.
pub type CursorClaim = OwnedMutexGuard<Cursor>;

/// In-memory map from branch to cursor slot.
#[derive(Debug, Default)]
pub struct CursorStore {
    slots: BTreeMap<BranchId, Arc<Mutex<Cursor>>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the cursor for `branch`, creating an unset one on first sight.
    ///
    /// Returns `None` if another pipeline for the branch still holds the claim.
    pub fn try_claim(&mut self, branch: &BranchId) -> Option<CursorClaim> {
        let slot = self
            .slots
            .entry(branch.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Cursor::Unset)));
        Arc::clone(slot).try_lock_owned().ok()
    }

    /// Reads the current cursor without claiming it.
    ///
    /// Returns `None` for unknown branches and for branches whose pipeline is running.
    pub fn peek(&self, branch: &BranchId) -> Option<Cursor> {
        let slot = self.slots.get(branch)?;
        slot.try_lock().ok().map(|cursor| *cursor)
    }
}
