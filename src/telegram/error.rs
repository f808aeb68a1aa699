//! Telegram Bot API errors and their delivery categorization.
//!
//! The Bot API reports failures as `{"ok": false, "error_code": N, "description": ...}`.
//! For delivery purposes these are mapped onto [`DeliveryErrorKind`]:
//!
//! - HTTP 403 (blocked, kicked, deactivated) and the 400s that mean the chat is gone
//!   are **unreachable**
//! - HTTP 429, 5xx and transport failures are **transient**
//! - every other API error is **rejected**

use std::fmt;

use thiserror::Error;

use crate::delivery::{DeliveryError, DeliveryErrorKind};

/// A failed Bot API call.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The request did not complete (connection, timeout, body decode).
    ///
    /// The request URL embeds the bot token, so it is stripped on conversion.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("{0}")]
    Api(ApiError),
}

/// An `ok: false` response from the Bot API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub error_code: Option<u16>,
    pub description: String,
    pub retry_after: Option<u64>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_code {
            Some(code) => write!(f, "Telegram API error ({}): {}", code, self.description),
            None => write!(f, "Telegram API error: {}", self.description),
        }
    }
}

impl ApiError {
    /// Categorizes this error for delivery reporting.
    pub fn kind(&self) -> DeliveryErrorKind {
        classify(self.error_code, &self.description)
    }
}

impl TelegramError {
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            TelegramError::Transport(_) => DeliveryErrorKind::Transient,
            TelegramError::Api(api) => api.kind(),
        }
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        TelegramError::Transport(err.without_url())
    }
}

impl From<TelegramError> for DeliveryError {
    fn from(err: TelegramError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            TelegramError::Transport(source) => DeliveryError::new(kind, message).with_source(source),
            TelegramError::Api(_) => DeliveryError::new(kind, message),
        }
    }
}

/// Maps an API error code and description onto a delivery error kind.
pub fn classify(error_code: Option<u16>, description: &str) -> DeliveryErrorKind {
    match error_code {
        Some(403) => DeliveryErrorKind::Unreachable,
        Some(400) if is_gone_chat(description) => DeliveryErrorKind::Unreachable,
        Some(429) => DeliveryErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => DeliveryErrorKind::Transient,
        Some(_) => DeliveryErrorKind::Rejected,
        None => DeliveryErrorKind::Transient,
    }
}

/// Checks whether a 400 description means the chat no longer accepts messages.
fn is_gone_chat(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("chat not found")
        || lower.contains("user is deactivated")
        || lower.contains("peer_id_invalid")
        || lower.contains("bot was kicked")
        || lower.contains("not enough rights to send")
        || lower.contains("group chat was upgraded")
}
