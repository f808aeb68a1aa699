//! Core domain types for the notice relay.
//!
//! This module contains the identifiers and records shared by every other module.

pub mod ids;
pub mod notice;

// Re-export commonly used types at the module level
pub use ids::{BranchId, InvalidBranch, SubscriberId};
pub use notice::{Notice, NoticeId, identity};
