//! Chat Platform Trait Abstractions
//!
//! The relay never talks to a chat platform directly. Everything it needs
//! from the outside world goes through three narrow capabilities:
//! - `GuildDirectory`: enumerate guilds, resolve channels and users
//! - `ModerationClient`: ban / unban a user in one guild
//! - `ChannelMessenger`: post text to a channel, receive inbound events
//!
//! These traits enable full test coverage via `InMemoryPlatform`.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Guild (community) identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct GuildId(pub u64);

/// User account identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Text channel identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Guild metadata as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
}

/// Resolved user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
}

/// Resolved text channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    /// Owning guild, `None` for channels outside every relayed guild
    pub guild: Option<GuildId>,
    pub name: String,
    /// Whether the relay account may post here
    pub can_send: bool,
}

/// Inbound chat message
#[derive(Debug, Clone)]
pub struct Message {
    pub channel: ChannelId,
    /// Guild the message was sent in (`None` for direct messages)
    pub guild: Option<GuildId>,
    pub author: UserInfo,
    /// Author holds the administrator permission in `guild`
    pub author_is_admin: bool,
    pub text: String,
}

/// Inbound platform event
#[derive(Debug, Clone)]
pub enum Event {
    /// Relay account was added to a guild
    GuildJoined(GuildInfo),
    /// A text message visible to the relay
    Message(Message),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform errors
///
/// `PermissionDenied` and `Timeout` are the two signals the propagation
/// engine contains per guild; everything else is reported the same way
/// but carries a different message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Missing permission: {0}")]
    PermissionDenied(String),

    #[error("Timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl PlatformError {
    /// True for the missing-permission signal
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, PlatformError::PermissionDenied(_))
    }
}

/// Guild enumeration and lookups
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// All guilds the relay account is currently a member of, in a stable order
    async fn guilds(&self) -> PlatformResult<Vec<GuildInfo>>;

    /// Resolve a channel inside `guild`. `Ok(None)` if it does not exist there.
    async fn resolve_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelInfo>>;

    /// Resolve a user account. `Ok(None)` if no such account exists.
    async fn resolve_user(&self, user: UserId) -> PlatformResult<Option<UserInfo>>;

    /// Whether the relay account holds the ban permission in `guild`
    async fn can_ban(&self, guild: GuildId) -> PlatformResult<bool>;
}

/// Per-guild moderation API
#[async_trait]
pub trait ModerationClient: Send + Sync {
    /// Ban `user` from `guild`, deleting `delete_message_days` of their history
    async fn ban(
        &self,
        guild: GuildId,
        user: UserId,
        reason: &str,
        delete_message_days: u8,
    ) -> PlatformResult<()>;

    /// Lift a ban on `user` in `guild`
    async fn unban(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()>;
}

/// Channel messaging and the inbound event stream
#[async_trait]
pub trait ChannelMessenger: Send + Sync {
    /// Post text to a channel
    async fn send_message(&self, channel: ChannelId, text: &str) -> PlatformResult<()>;

    /// Drain pending inbound events (empty if none)
    async fn receive_events(&self) -> PlatformResult<Vec<Event>>;

    /// The relay account's own user id
    fn self_id(&self) -> UserId;
}

/// Everything the relay needs from a chat platform
pub trait Platform: GuildDirectory + ModerationClient + ChannelMessenger + Clone {}

impl<T> Platform for T where T: GuildDirectory + ModerationClient + ChannelMessenger + Clone {}
