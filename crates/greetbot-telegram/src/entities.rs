//! Telegram entity mapping for the core converter.

use teloxide::types::{MessageEntity, MessageEntityKind};

use greetbot_core::formatting::{EntitySpan, SpanKind};

/// Map Telegram message entities into the core span model.
///
/// Offsets stay in UTF-16 code units, which is what the Bot API delivers
/// and what the converter expects.
pub fn to_spans(entities: &[MessageEntity]) -> Vec<EntitySpan> {
    entities
        .iter()
        .map(|entity| EntitySpan {
            offset: entity.offset,
            length: entity.length,
            kind: match &entity.kind {
                MessageEntityKind::Bold => SpanKind::Bold,
                MessageEntityKind::Italic => SpanKind::Italic,
                MessageEntityKind::Underline => SpanKind::Underline,
                MessageEntityKind::Strikethrough => SpanKind::Strikethrough,
                MessageEntityKind::Spoiler => SpanKind::Spoiler,
                MessageEntityKind::Code => SpanKind::Code,
                MessageEntityKind::Pre { .. } => SpanKind::Pre,
                MessageEntityKind::TextLink { url } => SpanKind::TextLink(url.to_string()),
                _ => SpanKind::Other,
            },
        })
        .collect()
}
