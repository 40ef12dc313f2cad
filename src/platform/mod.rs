//! Chat Platform Integration Module
//!
//! Capability traits for the external collaborators the relay depends on,
//! plus an in-memory implementation of all of them.

pub mod memory;
pub mod traits;

pub use memory::{Fault, InMemoryPlatform, ModerationCall, ModerationKind, SentMessage};
pub use traits::{
    ChannelId, ChannelInfo, ChannelMessenger, Event, GuildDirectory, GuildId, GuildInfo, Message,
    ModerationClient, Platform, PlatformError, PlatformResult, UserId, UserInfo,
};
