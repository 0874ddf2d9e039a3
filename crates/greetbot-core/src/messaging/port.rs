use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    Result,
};

/// Transport port.
///
/// Telegram is the only implementation today; the trait exists so the
/// greeting service can be exercised against a fake transport in tests.
/// Every call is a network round-trip and may fail.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a MarkdownV2-formatted message with link previews disabled.
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Reply to a specific message with a plain-text notice.
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<()>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Current administrators of a group chat.
    async fn chat_admins(&self, chat_id: ChatId) -> Result<Vec<UserId>>;
}
