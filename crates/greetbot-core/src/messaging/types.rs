use crate::{
    domain::{ChatId, MessageRef, UserId},
    formatting::EntitySpan,
};

/// Inbound chat events, already categorized by the transport adapter.
///
/// Text/photo/audio/sticker/voice messages collapse into `Activity`: their
/// only effect on the greeting state machine is "someone posted after the
/// bot".
#[derive(Clone, Debug)]
pub enum ChatEvent {
    MemberJoined(MemberJoined),
    Activity(Activity),
    SetGreeting(SetGreeting),
    Start(Start),
}

#[derive(Clone, Debug)]
pub struct MemberJoined {
    pub chat_id: ChatId,
    pub chat_title: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Activity {
    pub chat_id: ChatId,
    pub chat_title: Option<String>,
    pub kind: ActivityKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Text,
    Photo,
    Audio,
    Sticker,
    Voice,
}

/// `/use` issued in a group: make the replied-to message the greeting.
#[derive(Clone, Debug)]
pub struct SetGreeting {
    pub chat_id: ChatId,
    pub chat_title: Option<String>,
    pub sender: UserId,
    /// The command message itself, target of the notices.
    pub message: MessageRef,
    /// The replied-to message, absent when the command was not a reply.
    pub target: Option<ReplyTarget>,
}

#[derive(Clone, Debug)]
pub struct ReplyTarget {
    pub text: String,
    pub spans: Vec<EntitySpan>,
}

/// `/start`.
#[derive(Clone, Debug)]
pub struct Start {
    pub chat_id: ChatId,
    /// True for a one-to-one conversation with the bot.
    pub private: bool,
}
