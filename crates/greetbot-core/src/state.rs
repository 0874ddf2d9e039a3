//! Per-chat greeting state: throttling and duplicate-post suppression.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::domain::{ChatId, MessageRef};

/// Mutable per-chat record, created lazily on the first event for the chat.
#[derive(Clone, Copy, Debug, Default)]
struct ChatState {
    /// When the last greeting was actually sent; `None` means never.
    last_sent_at: Option<Instant>,
    /// True iff the most recent message observed in the chat is the bot's
    /// own greeting.
    bot_message_is_latest: bool,
    /// The last greeting sent, kept so it can be deleted before a
    /// replacement goes out. At most one reference is retained per chat.
    last_sent_ref: Option<MessageRef>,
}

/// Outcome of the greet decision, with the suppression reason when negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GreetGate {
    Ready,
    /// The bot's previous greeting is still the latest message in the chat.
    BotMessageLatest,
    /// Not enough time has passed since the last greeting.
    DelayNotElapsed { elapsed: Duration },
}

/// One record per chat id.
///
/// Callers serialize events per chat; the interior mutex only protects the
/// map against concurrent access from unrelated chats. No await points while
/// the lock is held.
#[derive(Default)]
pub struct ChatStateTable {
    chats: Mutex<HashMap<i64, ChatState>>,
}

impl ChatStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The greet decision: both rules must pass. The "already latest" check
    /// wins over the delay check, and the delay comparison is inclusive. A
    /// chat that never received a greeting is always past the delay.
    pub fn gate(&self, chat_id: ChatId, now: Instant, min_delay: Duration) -> GreetGate {
        let chats = self.chats.lock().expect("chat state table poisoned");
        let Some(state) = chats.get(&chat_id.0) else {
            return GreetGate::Ready;
        };

        if state.bot_message_is_latest {
            return GreetGate::BotMessageLatest;
        }
        match state.last_sent_at {
            None => GreetGate::Ready,
            Some(sent_at) => {
                let elapsed = now.saturating_duration_since(sent_at);
                if elapsed >= min_delay {
                    GreetGate::Ready
                } else {
                    GreetGate::DelayNotElapsed { elapsed }
                }
            }
        }
    }

    pub fn should_greet(&self, chat_id: ChatId, now: Instant, min_delay: Duration) -> bool {
        self.gate(chat_id, now, min_delay) == GreetGate::Ready
    }

    /// Record a successfully sent greeting.
    pub fn mark_sent(&self, chat_id: ChatId, now: Instant, message: MessageRef) {
        let mut chats = self.chats.lock().expect("chat state table poisoned");
        let state = chats.entry(chat_id.0).or_default();
        state.last_sent_at = Some(now);
        state.bot_message_is_latest = true;
        state.last_sent_ref = Some(message);
    }

    /// Someone else posted in the chat; the bot's greeting is no longer the
    /// latest message. Idempotent.
    pub fn mark_activity(&self, chat_id: ChatId) {
        let mut chats = self.chats.lock().expect("chat state table poisoned");
        chats.entry(chat_id.0).or_default().bot_message_is_latest = false;
    }

    /// The previous greeting to delete before sending a replacement.
    pub fn last_sent_ref(&self, chat_id: ChatId) -> Option<MessageRef> {
        self.chats
            .lock()
            .expect("chat state table poisoned")
            .get(&chat_id.0)
            .and_then(|state| state.last_sent_ref)
    }
}
