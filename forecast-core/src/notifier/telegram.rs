use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::info;

use crate::{
    error::{ForecastError, truncate_body},
    model::TelegramMessage,
};

use super::Notifier;

const SERVICE: &str = "Telegram";

/// Bot API client for `sendMessage`. One POST per message, never retried.
#[derive(Clone)]
pub struct TelegramNotifier {
    base_url: String,
    token: String,
    http: Client,
}

// Hand-written so the bot token never ends up in logs.
impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramNotifier {
    /// `base_url` is the Bot API root, e.g. `https://api.telegram.org`.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForecastError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ForecastError::Client)?;

        Ok(Self { base_url: base_url.into(), token: token.into(), http })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url.trim_end_matches('/'), self.token)
    }

    /// Post `message` and return the JSON body Telegram answers with, unchanged.
    pub async fn send_to_telegram(&self, message: &TelegramMessage) -> Result<Value, ForecastError> {
        message.validate()?;

        let mut params = vec![("chat_id", message.chat_id.as_str()), ("text", message.text.as_str())];
        if let Some(mode) = message.parse_mode.as_deref() {
            params.push(("parse_mode", mode));
        }

        let res = self
            .http
            .post(self.send_message_url())
            .query(&params)
            .send()
            .await
            // reqwest errors embed the URL, which carries the token
            .map_err(|e| ForecastError::Transport { service: SERVICE, source: e.without_url() })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ForecastError::Transport { service: SERVICE, source: e.without_url() })?;

        if !status.is_success() {
            return Err(ForecastError::Status { service: SERVICE, status, body: truncate_body(&body) });
        }

        let ack: Value = serde_json::from_str(&body)
            .map_err(|source| ForecastError::Decode { service: SERVICE, source })?;

        let message_id = ack.pointer("/result/message_id").and_then(Value::as_i64);
        info!(chat_id = %message.chat_id, ?message_id, "Message delivered to Telegram");

        Ok(ack)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &TelegramMessage) -> Result<Value, ForecastError> {
        self.send_to_telegram(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_url_embeds_token() {
        let notifier =
            TelegramNotifier::new("https://api.telegram.org/", "123:ABC", Duration::from_secs(5))
                .expect("notifier");

        assert_eq!(notifier.send_message_url(), "https://api.telegram.org/bot123:ABC/sendMessage");
    }

    #[test]
    fn debug_output_hides_token() {
        let notifier =
            TelegramNotifier::new("https://api.telegram.org", "123:SECRET", Duration::from_secs(5))
                .expect("notifier");

        let debug = format!("{notifier:?}");
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("<redacted>"));
    }
}
