//! User and channel references as typed in chat.
//!
//! Accepts raw ids (`123`) and mentions (`<@123>`, `<@!123>`, `<#123>`).

use crate::platform::{ChannelId, UserId};

/// Parse a user reference
pub fn parse_user_ref(text: &str) -> Option<UserId> {
    let text = text.trim();
    let id = match text.strip_prefix("<@").and_then(|s| s.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => text,
    };
    parse_id(id).map(UserId)
}

/// Parse a channel reference
pub fn parse_channel_ref(text: &str) -> Option<ChannelId> {
    let text = text.trim();
    let id = text
        .strip_prefix("<#")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(text);
    parse_id(id).map(ChannelId)
}

fn parse_id(text: &str) -> Option<u64> {
    // u64::from_str accepts a leading '+'
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
