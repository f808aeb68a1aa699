//! Command types for bot interactions.

use std::fmt;

use crate::types::BranchId;

/// A command sent to the bot in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` - greet the chat and explain usage.
    Start,

    /// `/help` - show usage.
    Help,

    /// `/subscribe <branch>` - follow a branch's notices.
    ///
    /// `None` when the branch argument was missing.
    Subscribe(Option<BranchId>),

    /// `/unsubscribe [branch]` - stop following one branch, or all branches.
    Unsubscribe(Option<BranchId>),

    /// `/branches` - list the branches that can be followed.
    Branches,

    /// `/status` - list the branches this chat follows.
    Status,

    /// Any other slash command addressed to the bot.
    Unknown(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => write!(f, "/start"),
            Command::Help => write!(f, "/help"),
            Command::Subscribe(Some(branch)) => write!(f, "/subscribe {}", branch),
            Command::Subscribe(None) => write!(f, "/subscribe"),
            Command::Unsubscribe(Some(branch)) => write!(f, "/unsubscribe {}", branch),
            Command::Unsubscribe(None) => write!(f, "/unsubscribe"),
            Command::Branches => write!(f, "/branches"),
            Command::Status => write!(f, "/status"),
            Command::Unknown(name) => write!(f, "/{}", name),
        }
    }
}
