//! Telegram adapter (teloxide).
//!
//! This crate implements the `greetbot-core` MessagingPort over the Telegram
//! Bot API and categorizes raw updates into core chat events.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

pub mod entities;
pub mod handlers;
pub mod router;

use greetbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .parse_mode(ParseMode::MarkdownV2)
            .disable_web_page_preview(true)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(to.chat_id), text.to_string())
            .reply_to_message_id(Self::tg_msg_id(to.message_id))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.bot
            .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn chat_admins(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        let admins = self
            .bot
            .get_chat_administrators(Self::tg_chat(chat_id))
            .await
            .map_err(Self::map_err)?;

        Ok(admins
            .into_iter()
            .map(|member| UserId(member.user.id.0 as i64))
            .collect())
    }
}
