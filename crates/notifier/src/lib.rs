//! Notification delivery.
//!
//! The tracker core only knows the [`NotificationSink`] contract:
//! fire-and-forget delivery of a text message to a chat. Delivery failures
//! are reported back to the caller, which logs them and moves on.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use thiserror::Error;

use pump_common::types::ChatId as TrackerChatId;

/// Escape untrusted text (token names) before embedding it in HTML messages.
pub use teloxide::utils::html::escape as escape_html;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Destination for user-facing messages. Text is HTML-formatted.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, chat_id: TrackerChatId, text: &str) -> Result<(), NotifyError>;
}

/// Delivers notifications as Telegram messages.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn notify(&self, chat_id: TrackerChatId, text: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await?;

        tracing::debug!(chat_id, "Notification delivered");
        Ok(())
    }
}
