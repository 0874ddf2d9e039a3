//! Update categorization: raw Telegram messages become core `ChatEvent`s.
//!
//! The categorizer is the only place that knows which Telegram message kinds
//! exist; the service only sees the event enum.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::error;

use greetbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{
        Activity, ActivityKind, ChatEvent, MemberJoined, ReplyTarget, SetGreeting, Start,
    },
};

use crate::entities;
use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = categorize(&msg) else {
        return Ok(());
    };

    // Serialize events per chat; unrelated chats proceed in parallel.
    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
    if let Err(e) = state.service.handle(event).await {
        error!("chat {}: handler failed: {e}", msg.chat.id.0);
    }
    Ok(())
}

fn categorize(msg: &Message) -> Option<ChatEvent> {
    let chat_id = ChatId(msg.chat.id.0);
    let chat_title = msg.chat.title().map(|t| t.to_string());

    if msg.new_chat_members().map_or(false, |m| !m.is_empty()) {
        return Some(ChatEvent::MemberJoined(MemberJoined {
            chat_id,
            chat_title,
        }));
    }

    if let Some(text) = msg.text() {
        if let Some((cmd, _args)) = parse_command(text) {
            match cmd.as_str() {
                "start" => {
                    return Some(ChatEvent::Start(Start {
                        chat_id,
                        private: msg.chat.is_private(),
                    }));
                }
                "use" => return set_greeting_event(msg).map(ChatEvent::SetGreeting),
                // Unknown commands are just chat activity.
                _ => {}
            }
        }
        return Some(ChatEvent::Activity(Activity {
            chat_id,
            chat_title,
            kind: ActivityKind::Text,
        }));
    }

    let kind = if msg.photo().is_some() {
        ActivityKind::Photo
    } else if msg.audio().is_some() {
        ActivityKind::Audio
    } else if msg.sticker().is_some() {
        ActivityKind::Sticker
    } else if msg.voice().is_some() {
        ActivityKind::Voice
    } else {
        return None;
    };

    Some(ChatEvent::Activity(Activity {
        chat_id,
        chat_title,
        kind,
    }))
}

fn set_greeting_event(msg: &Message) -> Option<SetGreeting> {
    let sender = UserId(msg.from()?.id.0 as i64);
    let target = msg.reply_to_message().map(|reply| ReplyTarget {
        text: reply.text().unwrap_or_default().to_string(),
        spans: entities::to_spans(reply.entities().unwrap_or_default()),
    });

    Some(SetGreeting {
        chat_id: ChatId(msg.chat.id.0),
        chat_title: msg.chat.title().map(|t| t.to_string()),
        sender,
        message: MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        },
        target,
    })
}

/// Split `/cmd@botname arg1 ...` into the lowercase command and its
/// arguments. Returns `None` for anything that is not a command.
fn parse_command(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    Some((cmd, rest))
}
