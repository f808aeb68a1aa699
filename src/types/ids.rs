//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a chat ID
//! where a branch is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A branch (department/category filter) on the notice board.
///
/// Branches are the unit of subscription. The value is submitted verbatim to the
/// source's branch selector, so it is compared exactly after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

/// Returned when a branch name is empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("branch name must not be empty")]
pub struct InvalidBranch;

impl BranchId {
    /// Parses a branch name, trimming surrounding whitespace.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, InvalidBranch> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(InvalidBranch);
        }
        Ok(BranchId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber, identified by its Telegram chat ID.
///
/// Group chats have negative IDs, so this is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(n: i64) -> Self {
        SubscriberId(n)
    }
}
