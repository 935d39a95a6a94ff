//! Notification channels.
//!
//! Everything goes to one operations chat; the recipient is named in the
//! message so sellers and buyers can be followed up by support.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::map_reqwest;
use crate::domain::errors::CollaboratorError;
use crate::domain::ports::{NotificationChannel, Recipient};

const TELEGRAM_API: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            bot_token,
            chat_id,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

fn render(recipient: Recipient, message: &str, metadata: &Value) -> String {
    let to = match recipient {
        Recipient::Buyer(id) => format!("buyer {id}"),
        Recipient::Seller(id) => format!("seller {id}"),
        Recipient::Operations => "operations".to_string(),
    };
    if metadata.is_null() {
        format!("[{to}] {message}")
    } else {
        format!("[{to}] {message}\n{metadata}")
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn notify(
        &self,
        recipient: Recipient,
        message: &str,
        metadata: &Value,
    ) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .post(format!(
                "{}/bot{}/sendMessage",
                self.api_base.trim_end_matches('/'),
                self.bot_token
            ))
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: render(recipient, message, metadata),
            })
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected(format!("telegram returned {status}")));
        }
        Ok(())
    }
}

/// Used when no bot is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationChannel for LogNotifier {
    async fn notify(
        &self,
        recipient: Recipient,
        message: &str,
        metadata: &Value,
    ) -> Result<(), CollaboratorError> {
        log::info!("notify {}", render(recipient, message, metadata));
        Ok(())
    }
}
