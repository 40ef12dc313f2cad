//! Control-channel directive grammar.
//!
//! Syntax (one line):
//! - `<ACTION>:<USER_ID>:<REASON>`
//!
//! `ACTION` is `ban` or `pardon` (any case). `USER_ID` is an integer or a
//! user mention. `REASON` is free text; only the first two colons are
//! delimiters, so the reason may contain more.

use super::refs::parse_user_ref;
use crate::platform::UserId;
use crate::relay::{ActionKind, ActionRequest};

/// Shown whenever the line does not have the three fields
pub const FORMAT_HINT: &str = "Invalid format. Must be <ACTION>:<USERID>:<REASON>";

/// Why a directive was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("Unknown action '{0}'. Use ban or pardon.")]
    UnknownAction(String),

    #[error("Invalid format. Must be <ACTION>:<USERID>:<REASON>")]
    InvalidUserId(String),

    #[error("Invalid format. Must be <ACTION>:<USERID>:<REASON> (missing user id)")]
    MissingUserId,

    #[error("Invalid format. Must be <ACTION>:<USERID>:<REASON> (missing reason)")]
    MissingReason,
}

/// Parser position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Action,
    User,
    Reason,
}

/// Split a line into its three fields. Missing fields are `None`.
fn split_fields(text: &str) -> (&str, Option<&str>, Option<&str>) {
    let mut field = Field::Action;
    let mut action_end = text.len();
    let mut user_range: Option<(usize, usize)> = None;
    let mut reason_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (field, c) {
            (Field::Action, ':') => {
                action_end = i;
                user_range = Some((i + 1, text.len()));
                field = Field::User;
            }
            (Field::User, ':') => {
                if let Some((start, _)) = user_range {
                    user_range = Some((start, i));
                }
                reason_start = Some(i + 1);
                field = Field::Reason;
            }
            (Field::Reason, _) => break,
            _ => {}
        }
    }

    (
        &text[..action_end],
        user_range.map(|(start, end)| &text[start..end]),
        reason_start.map(|start| &text[start..]),
    )
}

/// Parse a directive into an `ActionRequest`.
///
/// Checks run in field order, so the first bad field is the one reported.
pub fn parse_directive(
    text: &str,
    issuer: UserId,
    from_control_channel: bool,
) -> Result<ActionRequest, DirectiveError> {
    let (action, user, reason) = split_fields(text.trim());

    // Without a single delimiter there is no action field to judge
    if user.is_none() {
        return Err(DirectiveError::MissingUserId);
    }

    let kind = match action.trim().to_ascii_lowercase().as_str() {
        "ban" => ActionKind::Ban,
        "pardon" => ActionKind::Pardon,
        _ => return Err(DirectiveError::UnknownAction(action.trim().to_string())),
    };

    let user = user
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(DirectiveError::MissingUserId)?;
    let target =
        parse_user_ref(user).ok_or_else(|| DirectiveError::InvalidUserId(user.to_string()))?;

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(DirectiveError::MissingReason)?;

    Ok(ActionRequest::new(
        kind,
        target,
        reason,
        issuer,
        from_control_channel,
    ))
}

/// First word of a line, split at the first colon or whitespace
fn leading_word(text: &str) -> String {
    text.split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Cheap check used to decide whether a control-channel line is meant as
/// a directive at all (ordinary chat is ignored).
pub fn looks_like_directive(text: &str) -> bool {
    let text = text.trim();
    let first = leading_word(text);
    (text.contains(':') && !text.starts_with(':') && !first.is_empty()) || names_action(text)
}

/// Stricter check for lines outside the control channel: only a line that
/// opens with `ban` or `pardon` counts as a directive attempt.
pub fn names_action(text: &str) -> bool {
    matches!(leading_word(text.trim()).as_str(), "ban" | "pardon")
}
