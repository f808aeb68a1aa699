//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `NOTICE_BOT_TOKEN` | required |
//! | `NOTICE_BOT_NAME` | `notice_relay_bot` |
//! | `NOTICE_SOURCE_URL` | the IMS notifications page |
//! | `NOTICE_BRANCH_FIELD` | `branch` |
//! | `NOTICE_DB_PATH` | `ums-updates.db` |
//! | `NOTICE_POLL_INTERVAL_SECS` | `600` |
//! | `NOTICE_INITIAL_DELAY_SECS` | `2` |
//! | `NOTICE_LOOKBACK_LIMIT` | `50` |
//! | `NOTICE_BRANCHES` | empty (any branch accepted) |
//! | `NOTICE_MESSAGE_PREFIX` | `New notice on IMS` |
//! | `NOTICE_LISTEN_ADDR` | `0.0.0.0:3000` |
//! | `NOTICE_ENV` | `dev` |
//!
//! Values that are present but malformed are errors, never silently defaulted.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::delivery::DEFAULT_MESSAGE_PREFIX;
use crate::scheduler::ScheduleConfig;
use crate::source::{DEFAULT_BRANCH_FIELD, DEFAULT_SOURCE_URL};
use crate::types::BranchId;

const DEFAULT_BOT_NAME: &str = "notice_relay_bot";
const DEFAULT_DB_PATH: &str = "ums-updates.db";
const DEFAULT_LISTEN_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3000);

/// Errors from reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment; selects the default log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("expected dev or prod, got {other:?}")),
        }
    }
}

/// Everything the binary needs to start.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    /// Username used to recognise `/command@bot_name` in group chats.
    pub bot_name: String,
    pub source_url: String,
    pub branch_field: String,
    pub db_path: PathBuf,
    pub schedule: ScheduleConfig,
    /// Branches users may subscribe to. Empty means any.
    pub branches: Vec<BranchId>,
    pub message_prefix: String,
    pub listen_addr: SocketAddr,
    pub environment: Environment,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bot_token = get("NOTICE_BOT_TOKEN").ok_or(ConfigError::Missing("NOTICE_BOT_TOKEN"))?;

        let mut schedule = ScheduleConfig::new();
        if let Some(secs) = parse_var::<u64>(&get, "NOTICE_POLL_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(invalid("NOTICE_POLL_INTERVAL_SECS", "0", "must be positive"));
            }
            schedule.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&get, "NOTICE_INITIAL_DELAY_SECS")? {
            schedule.initial_delay = Duration::from_secs(secs);
        }
        if let Some(limit) = parse_var::<usize>(&get, "NOTICE_LOOKBACK_LIMIT")? {
            if limit == 0 {
                return Err(invalid("NOTICE_LOOKBACK_LIMIT", "0", "must be positive"));
            }
            schedule.lookback_limit = limit;
        }

        let branches = match get("NOTICE_BRANCHES") {
            Some(list) => parse_branches(&list),
            None => Vec::new(),
        };

        let listen_addr = parse_var::<SocketAddr>(&get, "NOTICE_LISTEN_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_LISTEN_ADDR));

        let environment = parse_var::<Environment>(&get, "NOTICE_ENV")?.unwrap_or_default();

        Ok(Config {
            bot_token,
            bot_name: get("NOTICE_BOT_NAME")
                .map(|n| n.trim().trim_start_matches('@').to_string())
                .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            source_url: get("NOTICE_SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            branch_field: get("NOTICE_BRANCH_FIELD")
                .unwrap_or_else(|| DEFAULT_BRANCH_FIELD.to_string()),
            db_path: get("NOTICE_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            schedule,
            branches,
            message_prefix: get("NOTICE_MESSAGE_PREFIX")
                .unwrap_or_else(|| DEFAULT_MESSAGE_PREFIX.to_string()),
            listen_addr,
            environment,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_name", &self.bot_name)
            .field("source_url", &self.source_url)
            .field("branch_field", &self.branch_field)
            .field("db_path", &self.db_path)
            .field("schedule", &self.schedule)
            .field("branches", &self.branches)
            .field("message_prefix", &self.message_prefix)
            .field("listen_addr", &self.listen_addr)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get(var)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| invalid(var, &raw, e)))
        .transpose()
}

fn invalid(var: &'static str, value: &str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a comma-separated branch list, dropping blanks and duplicates.
fn parse_branches(list: &str) -> Vec<BranchId> {
    let mut branches: Vec<BranchId> = Vec::new();
    for branch in list.split(',').filter_map(|b| BranchId::parse(b).ok()) {
        if !branches.contains(&branch) {
            branches.push(branch);
        }
    }
    branches
}
