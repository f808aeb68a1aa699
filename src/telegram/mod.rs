//! Telegram Bot API integration.
//!
//! Outbound, [`TelegramClient`] implements [`MessageSender`](crate::delivery::MessageSender)
//! on top of `sendMessage`. Inbound, [`UpdatePoller`] long-polls `getUpdates` and
//! answers chat commands through the [`CommandRouter`](crate::commands::CommandRouter).

pub mod client;
pub mod error;
pub mod types;
pub mod updates;

pub use client::TelegramClient;
pub use error::{ApiError, TelegramError, classify};
pub use updates::UpdatePoller;
