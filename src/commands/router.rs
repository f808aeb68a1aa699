//! Applies chat commands to the subscription store and renders replies.

use std::sync::Arc;

use tracing::{info, warn};

use super::types::Command;
use crate::subscriptions::{DirectoryError, SubscriptionStore};
use crate::types::{BranchId, SubscriberId};

const HELP: &str = "I forward new notices from the notice board.\n\n\
/subscribe <branch> - get notices for a branch\n\
/unsubscribe [branch] - stop notices for one branch, or all of them\n\
/branches - list the branches you can follow\n\
/status - list the branches you follow\n\
/help - show this message";

/// Handles commands for one bot.
///
/// When `known_branches` is non-empty, subscriptions are limited to those branches,
/// matched case-insensitively and stored under their configured spelling. An empty
/// list accepts any branch name.
pub struct CommandRouter<S> {
    store: Arc<S>,
    known_branches: Vec<BranchId>,
}

impl<S: SubscriptionStore> CommandRouter<S> {
    pub fn new(store: Arc<S>, known_branches: Vec<BranchId>) -> Self {
        CommandRouter {
            store,
            known_branches,
        }
    }

    /// Executes `command` on behalf of `chat` and returns the reply text.
    ///
    /// Storage failures are logged and answered with an apology; they never
    /// propagate to the update loop.
    pub fn handle(&self, chat: SubscriberId, command: Command) -> String {
        match self.execute(chat, &command) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(subscriber = %chat, command = %command, error = %e, "Command failed");
                "Sorry, something went wrong. Please try again later.".to_string()
            }
        }
    }

    fn execute(&self, chat: SubscriberId, command: &Command) -> Result<String, DirectoryError> {
        let reply = match command {
            Command::Start | Command::Help => HELP.to_string(),

            Command::Subscribe(None) => {
                "Usage: /subscribe <branch>\nSend /branches to see the choices.".to_string()
            }
            Command::Subscribe(Some(requested)) => match self.canonical(requested) {
                None => format!(
                    "Unknown branch {}. Send /branches to see the choices.",
                    requested
                ),
                Some(branch) => {
                    if self.store.subscribe(chat, &branch)? {
                        info!(subscriber = %chat, branch = %branch, "User {} subscribed to {}", chat, branch);
                        format!("Subscribed to {}.", branch)
                    } else {
                        format!("You are already subscribed to {}.", branch)
                    }
                }
            },

            Command::Unsubscribe(None) => {
                let removed = self.store.unsubscribe_all(chat)?;
                if removed == 0 {
                    "You have no subscriptions.".to_string()
                } else {
                    info!(subscriber = %chat, removed, "User {} unsubscribed", chat);
                    "Unsubscribed from all branches.".to_string()
                }
            }
            Command::Unsubscribe(Some(requested)) => {
                let branch = self.canonical(requested).unwrap_or_else(|| requested.clone());
                if self.store.unsubscribe(chat, &branch)? {
                    info!(subscriber = %chat, branch = %branch, "User {} unsubscribed from {}", chat, branch);
                    format!("Unsubscribed from {}.", branch)
                } else {
                    format!("You are not subscribed to {}.", branch)
                }
            }

            Command::Branches => {
                if self.known_branches.is_empty() {
                    "Any branch listed on the notice board can be followed.".to_string()
                } else {
                    format!("Branches: {}", join(&self.known_branches))
                }
            }

            Command::Status => {
                let branches = self.store.branches_of(chat)?;
                if branches.is_empty() {
                    "You have no subscriptions.".to_string()
                } else {
                    format!("Subscribed to: {}", join(&branches))
                }
            }

            Command::Unknown(name) => format!("Unknown command /{}. Send /help for usage.", name),
        };
        Ok(reply)
    }

    /// Resolves a requested branch against the configured list.
    fn canonical(&self, requested: &BranchId) -> Option<BranchId> {
        if self.known_branches.is_empty() {
            return Some(requested.clone());
        }
        self.known_branches
            .iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(requested.as_str()))
            .cloned()
    }
}

fn join(branches: &[BranchId]) -> String {
    branches
        .iter()
        .map(BranchId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
