//! Long-polling loop for incoming chat commands.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::TelegramClient;
use super::error::TelegramError;
use super::types::Update;
use crate::commands::{CommandRouter, parse_command};
use crate::delivery::TextFormat;
use crate::subscriptions::SubscriptionStore;
use crate::types::SubscriberId;

/// How long one `getUpdates` call waits for new messages.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the wait after repeated polling failures.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Receives chat messages and replies to commands.
pub struct UpdatePoller<S> {
    client: TelegramClient,
    router: CommandRouter<S>,
    bot_name: String,
}

impl<S: SubscriptionStore> UpdatePoller<S> {
    pub fn new(client: TelegramClient, router: CommandRouter<S>, bot_name: impl Into<String>) -> Self {
        UpdatePoller {
            client,
            router,
            bot_name: bot_name.into(),
        }
    }

    /// Polls until `shutdown` is cancelled.
    ///
    /// Polling failures are logged and retried with exponential backoff, honouring
    /// the API's `retry_after` hint when one is given.
    #[instrument(skip_all, fields(bot = %self.bot_name))]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Update poller started");
        let mut offset: Option<i64> = None;
        let mut failures: u32 = 0;

        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.client.get_updates(offset, POLL_TIMEOUT) => result,
            };

            match result {
                Ok(updates) => {
                    failures = 0;
                    for update in updates {
                        offset = Some(next_offset(offset, &update));
                        self.process(&update).await;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = retry_delay(&e, failures);
                    warn!(error = %e, failures, delay_secs = delay.as_secs(), "getUpdates failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Update poller stopped");
    }

    async fn process(&self, update: &Update) {
        let Some((chat, reply)) = self.reply_to(update) else {
            return;
        };
        if let Err(e) = self.client.send_message(chat.0, &reply, TextFormat::Plain).await {
            warn!(subscriber = %chat, error = %e, "Failed to send command reply");
        }
    }

    /// Handles one update, returning the chat to answer and the reply text.
    ///
    /// Updates without text, and text that is not a command for this bot, produce
    /// no reply.
    pub fn reply_to(&self, update: &Update) -> Option<(SubscriberId, String)> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;
        let command = parse_command(text, &self.bot_name)?;
        let chat = SubscriberId(message.chat.id);

        debug!(subscriber = %chat, command = %command, "Received command");
        Some((chat, self.router.handle(chat, command)))
    }
}

/// Offset that acknowledges `update` and everything before it.
fn next_offset(current: Option<i64>, update: &Update) -> i64 {
    let next = update.update_id + 1;
    current.map_or(next, |c| c.max(next))
}

/// Wait before the next poll after `failures` consecutive failures.
fn retry_delay(error: &TelegramError, failures: u32) -> Duration {
    if let TelegramError::Api(api) = error
        && let Some(secs) = api.retry_after
    {
        return Duration::from_secs(secs);
    }
    let exponent = failures.saturating_sub(1).min(6);
    Duration::from_secs(1 << exponent).min(MAX_BACKOFF)
}
