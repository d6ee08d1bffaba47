use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::error::NotifyError;
use crate::notify::Notifier;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends operator messages through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.base_url.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            client,
            endpoint,
            chat_id: config.chat_id.clone(),
        })
    }
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let reply: TelegramResponse = response.json().await.map_err(|e| {
            NotifyError::Rejected(format!("unreadable reply (HTTP {}): {}", status, e))
        })?;

        if !reply.ok {
            return Err(NotifyError::Rejected(
                reply
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        tracing::debug!("Telegram message sent");
        Ok(())
    }
}
