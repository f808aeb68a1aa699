//! Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::error::{ApiError, TelegramError};
use super::types::{ApiResponse, GetUpdatesRequest, SendMessageRequest, Update};
use crate::delivery::{DeliveryError, MessageSender, OutboundMessage, TextFormat};
use crate::types::SubscriberId;

const API_BASE: &str = "https://api.telegram.org";

/// Timeout for ordinary calls. Long polls add their own poll timeout on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A Bot API client authenticated with one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `https://api.telegram.org/bot<token>`; never logged.
    endpoint: String,
}

impl TelegramClient {
    /// Creates a client for the bot with the given token.
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_base(http, API_BASE, token))
    }

    /// Creates a client against a different API server (e.g. a local Bot API server).
    pub fn with_base(http: Client, base: &str, token: &str) -> Self {
        TelegramClient {
            http,
            endpoint: format!("{}/bot{}", base.trim_end_matches('/'), token),
        }
    }

    /// Sends a text message to a chat.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TelegramError> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: match format {
                TextFormat::Plain => None,
                TextFormat::MarkdownV2 => Some("MarkdownV2"),
            },
        };
        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }

    /// Long-polls for new message updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &body, Some(poll_timeout + REQUEST_TIMEOUT))
            .await
    }

    async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        trace!(method, "Bot API call");
        let mut request = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Error responses carry a JSON body too, so the status is not checked first.
        let response: ApiResponse<T> = request.send().await?.json().await?;
        into_result(response)
    }
}

fn into_result<T>(response: ApiResponse<T>) -> Result<T, TelegramError> {
    match response {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        other => Err(TelegramError::Api(ApiError {
            error_code: other.error_code,
            description: other
                .description
                .unwrap_or_else(|| "response without result".to_string()),
            retry_after: other.parameters.and_then(|p| p.retry_after),
        })),
    }
}

impl MessageSender for TelegramClient {
    async fn send(&self, to: SubscriberId, message: &OutboundMessage) -> Result<(), DeliveryError> {
        self.send_message(to.0, &message.text, message.format)
            .await
            .map_err(DeliveryError::from)
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}
