//! In-Memory Platform
//!
//! Implements every platform capability against local state. Used by the
//! test-suite and by the `run` console mode, where no real chat connection
//! exists.

use super::traits::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory chat platform
#[derive(Clone)]
pub struct InMemoryPlatform {
    state: Arc<Mutex<PlatformState>>,
    self_id: UserId,
}

#[derive(Default)]
struct PlatformState {
    guilds: Vec<GuildRecord>,
    channels: HashMap<ChannelId, ChannelInfo>,
    users: HashMap<UserId, UserInfo>,
    sent_messages: Vec<SentMessage>,
    moderation_calls: Vec<ModerationCall>,
    moderation_faults: HashMap<GuildId, Fault>,
    lookup_fault: Option<Fault>,
    incoming: VecDeque<Event>,
}

struct GuildRecord {
    info: GuildInfo,
    can_ban: bool,
    banned: HashSet<UserId>,
}

/// Injected failure for moderation calls or directory lookups
#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail immediately with this error
    Error(PlatformError),
    /// Never complete (exercises caller-side timeouts)
    Hang,
}

/// Message posted through `ChannelMessenger::send_message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub content: String,
}

/// Moderation call as observed by the platform (recorded before it fails)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationCall {
    pub guild: GuildId,
    pub user: UserId,
    pub kind: ModerationKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationKind {
    Ban,
    Unban,
}

impl InMemoryPlatform {
    pub fn new(self_id: UserId) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState::default())),
            self_id,
        }
    }

    fn state(&self) -> MutexGuard<'_, PlatformState> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a guild the relay is a member of (appended to iteration order)
    pub fn add_guild(&self, id: GuildId, name: &str, can_ban: bool) {
        let mut state = self.state();
        state.guilds.retain(|g| g.info.id != id);
        state.guilds.push(GuildRecord {
            info: GuildInfo {
                id,
                name: name.to_string(),
            },
            can_ban,
            banned: HashSet::new(),
        });
    }

    /// Remove a guild (relay kicked)
    pub fn remove_guild(&self, id: GuildId) {
        self.state().guilds.retain(|g| g.info.id != id);
    }

    /// Register a text channel
    pub fn add_channel(&self, id: ChannelId, guild: Option<GuildId>, name: &str, can_send: bool) {
        self.state().channels.insert(
            id,
            ChannelInfo {
                id,
                guild,
                name: name.to_string(),
                can_send,
            },
        );
    }

    /// Register a user account
    pub fn add_user(&self, id: UserId, name: &str) {
        self.state().users.insert(
            id,
            UserInfo {
                id,
                name: name.to_string(),
            },
        );
    }

    /// Grant or revoke the relay's ban permission in a guild
    pub fn set_can_ban(&self, guild: GuildId, can_ban: bool) {
        if let Some(record) = self.state().guilds.iter_mut().find(|g| g.info.id == guild) {
            record.can_ban = can_ban;
        }
    }

    /// Make every moderation call in `guild` fail with `fault`
    pub fn inject_fault(&self, guild: GuildId, fault: Fault) {
        self.state().moderation_faults.insert(guild, fault);
    }

    /// Remove an injected fault
    pub fn clear_fault(&self, guild: GuildId) {
        self.state().moderation_faults.remove(&guild);
    }

    /// Make every `resolve_user` / `resolve_channel` lookup fail with `fault`
    pub fn inject_lookup_fault(&self, fault: Fault) {
        self.state().lookup_fault = Some(fault);
    }

    pub fn clear_lookup_fault(&self) {
        self.state().lookup_fault = None;
    }

    /// Queue an inbound event
    pub fn push_event(&self, event: Event) {
        self.state().incoming.push_back(event);
    }

    /// Sent messages for assertions
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().sent_messages.clone()
    }

    /// Messages posted to one channel
    pub fn messages_in(&self, channel: ChannelId) -> Vec<String> {
        self.state()
            .sent_messages
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Moderation calls for assertions
    pub fn moderation_calls(&self) -> Vec<ModerationCall> {
        self.state().moderation_calls.clone()
    }

    /// Moderation calls that targeted one guild
    pub fn moderation_calls_in(&self, guild: GuildId) -> Vec<ModerationCall> {
        self.state()
            .moderation_calls
            .iter()
            .filter(|c| c.guild == guild)
            .cloned()
            .collect()
    }

    /// Whether `user` is currently banned in `guild`
    pub fn is_banned(&self, guild: GuildId, user: UserId) -> bool {
        self.state()
            .guilds
            .iter()
            .find(|g| g.info.id == guild)
            .map(|g| g.banned.contains(&user))
            .unwrap_or(false)
    }

    /// Clear recorded calls and messages, keeping guilds/channels/users
    pub fn clear_history(&self) {
        let mut state = self.state();
        state.sent_messages.clear();
        state.moderation_calls.clear();
    }

    async fn moderate(
        &self,
        guild: GuildId,
        user: UserId,
        reason: &str,
        kind: ModerationKind,
    ) -> PlatformResult<()> {
        let fault = {
            let mut state = self.state();
            state.moderation_calls.push(ModerationCall {
                guild,
                user,
                kind,
                reason: reason.to_string(),
            });
            state.moderation_faults.get(&guild).cloned()
        };

        apply_fault(fault).await?;

        let mut state = self.state();
        let record = state
            .guilds
            .iter_mut()
            .find(|g| g.info.id == guild)
            .ok_or_else(|| PlatformError::NotFound(format!("guild {}", guild)))?;

        if !record.can_ban {
            return Err(PlatformError::PermissionDenied(format!(
                "ban members in {}",
                record.info.name
            )));
        }

        match kind {
            ModerationKind::Ban => {
                record.banned.insert(user);
            }
            ModerationKind::Unban => {
                if !record.banned.remove(&user) {
                    return Err(PlatformError::NotFound(format!("ban for user {}", user)));
                }
            }
        }
        Ok(())
    }
}

async fn apply_fault(fault: Option<Fault>) -> PlatformResult<()> {
    match fault {
        Some(Fault::Error(e)) => Err(e),
        Some(Fault::Hang) => futures::future::pending().await,
        None => Ok(()),
    }
}

#[async_trait]
impl GuildDirectory for InMemoryPlatform {
    async fn guilds(&self) -> PlatformResult<Vec<GuildInfo>> {
        Ok(self.state().guilds.iter().map(|g| g.info.clone()).collect())
    }

    async fn resolve_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelInfo>> {
        let fault = self.state().lookup_fault.clone();
        apply_fault(fault).await?;
        Ok(self
            .state()
            .channels
            .get(&channel)
            .filter(|c| c.guild == Some(guild))
            .cloned())
    }

    async fn resolve_user(&self, user: UserId) -> PlatformResult<Option<UserInfo>> {
        let fault = self.state().lookup_fault.clone();
        apply_fault(fault).await?;
        Ok(self.state().users.get(&user).cloned())
    }

    async fn can_ban(&self, guild: GuildId) -> PlatformResult<bool> {
        self.state()
            .guilds
            .iter()
            .find(|g| g.info.id == guild)
            .map(|g| g.can_ban)
            .ok_or_else(|| PlatformError::NotFound(format!("guild {}", guild)))
    }
}

#[async_trait]
impl ModerationClient for InMemoryPlatform {
    async fn ban(
        &self,
        guild: GuildId,
        user: UserId,
        reason: &str,
        _delete_message_days: u8,
    ) -> PlatformResult<()> {
        self.moderate(guild, user, reason, ModerationKind::Ban).await
    }

    async fn unban(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()> {
        self.moderate(guild, user, reason, ModerationKind::Unban)
            .await
    }
}

#[async_trait]
impl ChannelMessenger for InMemoryPlatform {
    async fn send_message(&self, channel: ChannelId, text: &str) -> PlatformResult<()> {
        let mut state = self.state();
        let info = state
            .channels
            .get(&channel)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {}", channel)))?;

        if !info.can_send {
            return Err(PlatformError::PermissionDenied(format!(
                "send messages in #{}",
                info.name
            )));
        }

        state.sent_messages.push(SentMessage {
            channel,
            content: text.to_string(),
        });
        Ok(())
    }

    async fn receive_events(&self) -> PlatformResult<Vec<Event>> {
        Ok(self.state().incoming.drain(..).collect())
    }

    fn self_id(&self) -> UserId {
        self.self_id
    }
}
