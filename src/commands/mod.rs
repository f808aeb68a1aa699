//! Command parsing and handling for chat commands.
//!
//! This module provides types and parsing for the slash commands that users send
//! to the bot to manage their branch subscriptions, and a router that applies
//! them to the subscription store.
//!
//! # Supported Commands
//!
//! - `/start`, `/help` - Explains how to use the bot
//! - `/subscribe <branch>` - Follows the notices of a branch
//! - `/unsubscribe [branch]` - Stops following one branch, or every branch
//! - `/branches` - Lists the branches that can be followed
//! - `/status` - Lists the branches this chat follows
//!
//! # Example
//!
//! ```
//! use notice_relay::commands::{parse_command, Command};
//!
//! assert_eq!(parse_command("/help", "relay_bot"), Some(Command::Help));
//! assert_eq!(parse_command("/unsubscribe", "relay_bot"), Some(Command::Unsubscribe(None)));
//!
//! // Commands addressed to another bot in a group chat are ignored
//! assert_eq!(parse_command("/help@other_bot", "relay_bot"), None);
//! ```

mod parser;
mod router;
mod types;

pub use parser::parse_command;
pub use router::CommandRouter;
pub use types::Command;
