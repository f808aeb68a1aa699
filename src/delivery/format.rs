//! Rendering notices into outbound messages.
//!
//! A notice with a link is sent as MarkdownV2 with the title as link text. Any markup
//! control character in the label is backslash-escaped. A notice without a link is
//! sent as plain text, unescaped.

use super::OutboundMessage;
use crate::types::Notice;

/// Prefix placed before every notice title.
pub const DEFAULT_MESSAGE_PREFIX: &str = "New notice on IMS";

/// Characters the outbound renderer treats as markup in a link label.
const MARKDOWN_SPECIAL: &[char] = &[
    '\\', '`', '*', '_', '{', '}', '[', ']', '(', ')', '#', '+', '-', '.', '!', '|', '>', '=',
    '~',
];

/// Backslash-escapes markup control characters.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes a link target. Inside `(...)` only `)` and `\` are significant.
fn escape_link_target(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Formats notices with a fixed prefix.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    prefix: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_PREFIX)
    }
}

impl MessageFormatter {
    pub fn new(prefix: impl Into<String>) -> Self {
        MessageFormatter {
            prefix: prefix.into(),
        }
    }

    pub fn render(&self, notice: &Notice) -> OutboundMessage {
        match notice.url() {
            Some(url) => OutboundMessage::markdown(format!(
                "{}: [{}]({})",
                escape_markdown(&self.prefix),
                escape_markdown(notice.title()),
                escape_link_target(url)
            )),
            None => OutboundMessage::plain(format!("{}: {}", self.prefix, notice.title())),
        }
    }
}
