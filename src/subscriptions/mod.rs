//! Chat subscriptions to branches.
//!
//! The core only ever reads subscriptions, once per tick, through
//! [`SubscriptionDirectory::snapshot`]. Adding and removing subscriptions belongs to
//! the command layer, which uses [`SubscriptionStore`].
//!
//! Implementations:
//! - [`SqliteSubscriptions`]: durable storage in a single SQLite table
//! - [`InMemorySubscriptions`]: a map, for tests and dry runs

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::types::{BranchId, SubscriberId};

pub mod memory;
pub mod sqlite;

pub use memory::InMemorySubscriptions;
pub use sqlite::SqliteSubscriptions;

/// Errors from subscription storage.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The storage lock was poisoned by a panicking thread.
    #[error("subscription storage lock poisoned")]
    Poisoned,
}

/// Read access to subscriptions.
pub trait SubscriptionDirectory: Send + Sync {
    /// Returns every subscriber of `branch`.
    fn subscribers_of(&self, branch: &BranchId) -> Result<BTreeSet<SubscriberId>, DirectoryError>;

    /// Returns every branch with at least one subscriber, sorted.
    fn all_branches(&self) -> Result<Vec<BranchId>, DirectoryError>;

    /// Captures the whole branch-to-subscribers mapping at once.
    fn snapshot(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let mut by_branch = BTreeMap::new();
        for branch in self.all_branches()? {
            let subscribers = self.subscribers_of(&branch)?;
            by_branch.insert(branch, subscribers);
        }
        Ok(DirectorySnapshot { by_branch })
    }
}

/// Mutation of subscriptions, used by the command layer.
pub trait SubscriptionStore: SubscriptionDirectory {
    /// Subscribes `subscriber` to `branch`. Returns false if already subscribed.
    fn subscribe(&self, subscriber: SubscriberId, branch: &BranchId) -> Result<bool, DirectoryError>;

    /// Removes one subscription. Returns false if it did not exist.
    fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        branch: &BranchId,
    ) -> Result<bool, DirectoryError>;

    /// Removes every subscription of `subscriber`. Returns how many were removed.
    fn unsubscribe_all(&self, subscriber: SubscriberId) -> Result<usize, DirectoryError>;

    /// Returns the branches `subscriber` follows, sorted.
    fn branches_of(&self, subscriber: SubscriberId) -> Result<Vec<BranchId>, DirectoryError>;
}

/// A point-in-time copy of the directory, read once per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    by_branch: BTreeMap<BranchId, BTreeSet<SubscriberId>>,
}

impl DirectorySnapshot {
    /// Branches with subscribers, in order.
    pub fn branches(&self) -> impl Iterator<Item = &BranchId> {
        self.by_branch
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(branch, _)| branch)
    }

    pub fn subscribers_of(&self, branch: &BranchId) -> BTreeSet<SubscriberId> {
        self.by_branch.get(branch).cloned().unwrap_or_default()
    }

    pub fn subscription_count(&self) -> usize {
        self.by_branch.values().map(BTreeSet::len).sum()
    }
}
