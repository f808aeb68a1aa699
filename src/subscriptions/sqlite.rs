//! SQLite-backed subscription store.
//!
//! # Schema
//!
//! ```text
//! subscriptions(chat_id INTEGER NOT NULL, branch TEXT NOT NULL,
//!               PRIMARY KEY (chat_id, branch))
//! ```
//!
//! The primary key makes `subscribe` idempotent. Connections are opened with a busy
//! timeout so a second process reading the file does not fail immediately.
//!
//! Rows whose branch fails validation (written by hand or by an older build) are
//! skipped with a warning, so they cannot stall delivery for every other branch.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rusqlite::{Connection, params};
use tracing::{debug, error, info, warn};

use super::{DirectoryError, DirectorySnapshot, SubscriptionDirectory, SubscriptionStore};
use crate::types::{BranchId, SubscriberId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS subscriptions (
    chat_id INTEGER NOT NULL,
    branch TEXT NOT NULL,
    PRIMARY KEY (chat_id, branch)
);
CREATE INDEX IF NOT EXISTS subscriptions_branch ON subscriptions (branch);";

/// Subscriptions persisted in a SQLite database.
///
/// `rusqlite::Connection` is not `Sync`, so access is serialized through a mutex.
/// Every operation is a single short statement.
#[derive(Debug)]
pub struct SqliteSubscriptions {
    conn: Mutex<Connection>,
}

impl SqliteSubscriptions {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let started_at = Instant::now();
        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open subscription database");
                return Err(e.into());
            }
        };
        let store = Self::bootstrap(conn)?;
        info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Opened subscription database"
        );
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DirectoryError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, DirectoryError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteSubscriptions {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DirectoryError> {
        self.conn.lock().map_err(|_| DirectoryError::Poisoned)
    }
}

/// Parses a stored branch name, logging and discarding invalid ones.
fn stored_branch(raw: &str) -> Option<BranchId> {
    match BranchId::parse(raw) {
        Ok(branch) => Some(branch),
        Err(_) => {
            warn!(branch = ?raw, "Skipping subscription row with invalid branch");
            None
        }
    }
}

impl SubscriptionDirectory for SqliteSubscriptions {
    fn subscribers_of(&self, branch: &BranchId) -> Result<BTreeSet<SubscriberId>, DirectoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT chat_id FROM subscriptions WHERE branch = ?1")?;
        let rows = stmt.query_map(params![branch.as_str()], |row| row.get::<_, i64>(0))?;
        let mut subscribers = BTreeSet::new();
        for row in rows {
            subscribers.insert(SubscriberId(row?));
        }
        Ok(subscribers)
    }

    fn all_branches(&self) -> Result<Vec<BranchId>, DirectoryError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT DISTINCT branch FROM subscriptions ORDER BY branch")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut branches = Vec::new();
        for row in rows {
            branches.extend(stored_branch(&row?));
        }
        branches.sort();
        Ok(branches)
    }

    /// Reads every subscription in one statement under one lock.
    fn snapshot(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT branch, chat_id FROM subscriptions")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut by_branch: BTreeMap<BranchId, BTreeSet<SubscriberId>> = BTreeMap::new();
        for row in rows {
            let (raw, chat_id) = row?;
            if let Some(branch) = stored_branch(&raw) {
                by_branch
                    .entry(branch)
                    .or_default()
                    .insert(SubscriberId(chat_id));
            }
        }
        Ok(DirectorySnapshot { by_branch })
    }
}

impl SubscriptionStore for SqliteSubscriptions {
    fn subscribe(&self, subscriber: SubscriberId, branch: &BranchId) -> Result<bool, DirectoryError> {
        let changed = self.conn()?.execute(
            "INSERT OR IGNORE INTO subscriptions (chat_id, branch) VALUES (?1, ?2)",
            params![subscriber.0, branch.as_str()],
        )?;
        debug!(%subscriber, %branch, inserted = changed > 0, "subscribe");
        Ok(changed > 0)
    }

    fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        branch: &BranchId,
    ) -> Result<bool, DirectoryError> {
        let changed = self.conn()?.execute(
            "DELETE FROM subscriptions WHERE chat_id = ?1 AND branch = ?2",
            params![subscriber.0, branch.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn unsubscribe_all(&self, subscriber: SubscriberId) -> Result<usize, DirectoryError> {
        let changed = self.conn()?.execute(
            "DELETE FROM subscriptions WHERE chat_id = ?1",
            params![subscriber.0],
        )?;
        Ok(changed)
    }

    fn branches_of(&self, subscriber: SubscriberId) -> Result<Vec<BranchId>, DirectoryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT branch FROM subscriptions WHERE chat_id = ?1 ORDER BY branch")?;
        let rows = stmt.query_map(params![subscriber.0], |row| row.get::<_, String>(0))?;
        let mut branches = Vec::new();
        for row in rows {
            branches.extend(stored_branch(&row?));
        }
        branches.sort();
        Ok(branches)
    }
}
