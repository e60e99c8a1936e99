use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};
use thiserror::Error;

/// Transport send/edit failure. Logged at the call site, never retried, never
/// aborts the enclosing loop.
#[derive(Debug, Error)]
#[error("delivery failed: {message}")]
pub struct DeliveryError {
    message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<teloxide::RequestError> for DeliveryError {
    fn from(err: teloxide::RequestError) -> Self {
        Self::new(err.to_string())
    }
}

/// Outbound half of the chat transport. Dispatch and broadcast talk to this
/// seam; tests substitute a recording fake.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Send a plain text message; returns the transport message id.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i32, DeliveryError>;

    /// Send a text message with an inline keyboard attached.
    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<i32, DeliveryError>;

    /// Attach (or replace) the inline keyboard of a previously sent message.
    async fn attach_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), DeliveryError>;

    /// Acknowledge a callback so the client clears its loading indicator.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError>;
}

/// Telegram-backed implementation over a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i32, DeliveryError> {
        let msg = self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(msg.id.0)
    }

    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<i32, DeliveryError> {
        let msg = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(keyboard)
            .await?;
        Ok(msg.id.0)
    }

    async fn attach_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), DeliveryError> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError> {
        self.bot.answer_callback_query(callback_id.to_string()).await?;
        Ok(())
    }
}
