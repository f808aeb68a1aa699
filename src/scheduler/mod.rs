//! Scheduling of branch pipelines.
//!
//! A single repeating timer drives the bot. Every tick takes one snapshot of the
//! subscription directory and runs one pipeline per subscribed branch:
//!
//! ```text
//! NoticeSource::fetch -> DiffEngine::diff (cursor updated) -> FanoutDispatcher::dispatch
//! ```
//!
//! # Isolation
//!
//! - Branches run concurrently and never affect each other; a fetch or parse error
//!   ends only that branch's run, leaving its cursor untouched
//! - A branch whose previous run is still in flight is skipped for the tick
//! - The cursor is committed before fanout, so delivery failures never cause a
//!   notice to be sent again
//!
//! # Module Structure
//!
//! - [`config`]: timer settings
//! - [`pipeline`]: one branch's fetch, diff and fanout
//! - [`status`]: per-branch status shared with the HTTP API
//! - [`ticker`]: the timer loop and task management

pub mod config;
pub mod pipeline;
pub mod status;
pub mod ticker;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_INITIAL_DELAY_SECS, DEFAULT_POLL_INTERVAL_SECS, ScheduleConfig};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome};
pub use status::{BranchStatus, RunOutcome, RunRecord, StatusBoard};
pub use ticker::{Scheduler, TickSummary};
