//! Outbound delivery of notices to subscribers.
//!
//! - [`format`]: rendering a notice into an outbound message
//! - [`fanout`]: delivering a branch's new notices to every subscriber
//!
//! Delivery errors are categorized so the operator can tell a subscriber who has gone
//! away from a hiccup in the messaging platform:
//!
//! - **Unreachable**: the recipient blocked the bot, left, or no longer exists
//! - **Transient**: rate limits, server errors, network failures
//! - **Rejected**: the platform refused this particular message
//!
//! No kind is retried within a tick.

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::types::SubscriberId;

pub mod fanout;
pub mod format;

pub use fanout::{DeliveryFailure, DeliveryReport, FanoutDispatcher};
pub use format::{DEFAULT_MESSAGE_PREFIX, MessageFormatter, escape_markdown};

/// How the messaging platform should interpret the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    MarkdownV2,
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub format: TextFormat,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        OutboundMessage {
            text: text.into(),
            format: TextFormat::Plain,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        OutboundMessage {
            text: text.into(),
            format: TextFormat::MarkdownV2,
        }
    }
}

/// The kind of delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// The recipient cannot be reached (blocked the bot, chat deleted, kicked).
    ///
    /// Not retryable within the tick; further messages to the same recipient in the
    /// same tick are skipped.
    Unreachable,

    /// A temporary condition (HTTP 429, 5xx, network errors).
    Transient,

    /// The platform refused this message (other 4xx, e.g. bad markup).
    Rejected,
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryErrorKind::Unreachable => "unreachable",
            DeliveryErrorKind::Transient => "transient",
            DeliveryErrorKind::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A failed delivery to one recipient.
#[derive(Debug, Error)]
#[error("{kind} delivery failure: {message}")]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        DeliveryError {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Unreachable, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Transient, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Rejected, message)
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Sends messages to subscribers.
pub trait MessageSender: Send + Sync {
    fn send(
        &self,
        to: SubscriberId,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
