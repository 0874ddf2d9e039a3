//! Formatting-entity conversion (rich text → Telegram MarkdownV2).

/// A formatting span attached to a message.
///
/// `offset` and `length` are in UTF-16 code units, the convention used by the
/// Telegram Bot API for message entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySpan {
    pub offset: usize,
    pub length: usize,
    pub kind: SpanKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre,
    TextLink(String),
    /// Anything the converter does not style (mentions, hashtags, ...).
    Other,
}

/// Characters that must be escaped in MarkdownV2 text outside code spans.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape plain text for MarkdownV2.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape the contents of an inline-code or pre span.
pub fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a URL inside a `[label](url)` link.
pub fn escape_link_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert raw message text plus formatting spans into a MarkdownV2 string.
///
/// Spans are applied flat: overlapping or nested spans after the first are
/// dropped and their text degrades to escaped plain text. Out-of-bounds and
/// zero-length spans are ignored.
pub fn to_markdown_v2(text: &str, spans: &[EntitySpan]) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();

    let mut sorted: Vec<&EntitySpan> = spans
        .iter()
        .filter(|s| !matches!(s.kind, SpanKind::Other))
        .filter(|s| s.length > 0 && s.offset.saturating_add(s.length) <= units.len())
        .collect();
    sorted.sort_by_key(|s| (s.offset, s.length));

    let mut picked: Vec<&EntitySpan> = Vec::new();
    let mut covered_to = 0usize;
    for span in sorted {
        if span.offset >= covered_to {
            covered_to = span.offset + span.length;
            picked.push(span);
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0usize;
    for span in picked {
        out.push_str(&escape(&decode(&units[pos..span.offset])));
        let seg = decode(&units[span.offset..span.offset + span.length]);
        match &span.kind {
            SpanKind::Bold => wrap(&mut out, "*", &seg),
            SpanKind::Italic => wrap(&mut out, "_", &seg),
            SpanKind::Underline => wrap(&mut out, "__", &seg),
            SpanKind::Strikethrough => wrap(&mut out, "~", &seg),
            SpanKind::Spoiler => wrap(&mut out, "||", &seg),
            SpanKind::Code => {
                out.push('`');
                out.push_str(&escape_code(&seg));
                out.push('`');
            }
            SpanKind::Pre => {
                out.push_str("```\n");
                out.push_str(&escape_code(&seg));
                out.push_str("\n```");
            }
            SpanKind::TextLink(url) => {
                out.push('[');
                out.push_str(&escape(&seg));
                out.push_str("](");
                out.push_str(&escape_link_url(url));
                out.push(')');
            }
            SpanKind::Other => out.push_str(&escape(&seg)),
        }
        pos = span.offset + span.length;
    }
    out.push_str(&escape(&decode(&units[pos..])));

    out
}

fn wrap(out: &mut String, delim: &str, seg: &str) {
    out.push_str(delim);
    out.push_str(&escape(seg));
    out.push_str(delim);
}

fn decode(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}
