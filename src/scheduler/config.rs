//! Timing configuration for the scrape schedule.
//!
//! # Schedule
//!
//! - **Initial delay**: 2 seconds after start-up before the first tick
//! - **Interval**: 10 minutes between ticks (configurable via `NOTICE_POLL_INTERVAL_SECS`)
//! - **Lookback limit**: how many listing entries the diff scans for the cursor
//!   before treating it as lost (configurable via `NOTICE_LOOKBACK_LIMIT`)

use std::time::Duration;

use crate::diff::DEFAULT_LOOKBACK_LIMIT;

/// Default interval between ticks (10 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Default delay before the first tick.
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 2;

/// Configuration for the scheduler's repeating timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Interval between ticks.
    ///
    /// Default: 10 minutes. Configure via `NOTICE_POLL_INTERVAL_SECS`.
    pub interval: Duration,

    /// Delay before the first tick.
    ///
    /// Default: 2 seconds. Configure via `NOTICE_INITIAL_DELAY_SECS`.
    pub initial_delay: Duration,

    /// Number of listing entries the diff may scan to find the cursor.
    ///
    /// Default: 50.
    pub lookback_limit: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleConfig {
    /// Creates a `ScheduleConfig` with default values.
    pub fn new() -> Self {
        ScheduleConfig {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            lookback_limit: DEFAULT_LOOKBACK_LIMIT,
        }
    }

    /// Returns the interval, never shorter than one second.
    ///
    /// `tokio::time::interval` panics on a zero period.
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(Duration::from_secs(1))
    }
}
