//! Notice Relay - a chat bot that forwards new notice-board announcements to
//! subscribers.
//!
//! Every tick the bot scrapes the notice board once per subscribed branch, works out
//! which notices appeared since the last scrape, and sends each new notice to every
//! chat subscribed to that branch, oldest first and exactly once.
//!
//! # Module Structure
//!
//! - [`source`]: fetching and parsing the notice board
//! - [`diff`] and [`cursor`]: detecting new notices per branch
//! - [`delivery`]: formatting and fanning out messages
//! - [`subscriptions`]: which chats follow which branches
//! - [`scheduler`]: the timer that runs branch pipelines
//! - [`telegram`] and [`commands`]: the Telegram Bot API and chat commands
//! - [`server`]: health and status HTTP endpoints

pub mod commands;
pub mod config;
pub mod cursor;
pub mod delivery;
pub mod diff;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod subscriptions;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod test_utils;
