//! Command Surface
//!
//! Routes one inbound message:
//! - control-channel directives (`ban:<id>:<reason>`) go to the engine
//! - prefixed admin commands change the issuing guild's own settings
//! - everything else is ignored
//!
//! Request-level problems (shape, source, unknown target) are rejected
//! here, before any guild is contacted.

use super::admin::{opt_levels_help, parse_admin_command, AdminCommand};
use super::directive::{looks_like_directive, names_action, parse_directive};
use crate::platform::{ChannelId, GuildId, Message, Platform, UserId};
use crate::relay::{
    PropagationEngine, PropagationReport, RelayError, DEFAULT_DELETE_MESSAGE_DAYS,
};
use crate::settings::{ConfigStore, OptTier};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Default admin command prefix
pub const DEFAULT_COMMAND_PREFIX: &str = "g!";

/// Reply when an admin command could not reach the platform
const ADMIN_PLATFORM_FAILURE: &str =
    "Could not reach the chat platform, nothing was changed. Please try again.";

/// Routing configuration
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// The one channel where directives are accepted
    pub control_channel: ChannelId,
    pub command_prefix: String,
    /// Issuers allowed to send directives; empty means anyone who can post
    /// in the control channel
    pub privileged_issuers: BTreeSet<UserId>,
    /// Answer rejected directives instead of dropping them silently
    pub unauthorized_reply: bool,
    pub delete_message_days: u8,
}

impl SurfaceConfig {
    pub fn new(control_channel: ChannelId) -> Self {
        Self {
            control_channel,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            privileged_issuers: BTreeSet::new(),
            unauthorized_reply: false,
            delete_message_days: DEFAULT_DELETE_MESSAGE_DAYS,
        }
    }
}

/// Parses inbound messages and drives the engine and the settings store
pub struct CommandSurface<P: Platform> {
    platform: P,
    store: Arc<ConfigStore>,
    engine: PropagationEngine<P>,
    config: SurfaceConfig,
}

impl<P: Platform> CommandSurface<P> {
    pub fn new(
        platform: P,
        store: Arc<ConfigStore>,
        engine: PropagationEngine<P>,
        config: SurfaceConfig,
    ) -> Self {
        Self {
            platform,
            store,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Handle one message and return the reply for its channel, if any.
    ///
    /// Only fatal errors (settings store failures) are returned as `Err`;
    /// everything else becomes reply text or is dropped. Platform lookups
    /// are bounded by the engine's `call_timeout`.
    pub async fn handle_message(&self, message: &Message) -> Result<Option<String>, RelayError> {
        if message.author.id == self.platform.self_id() {
            return Ok(None);
        }

        let text = message.text.trim();

        if let Some(body) = text.strip_prefix(self.config.command_prefix.as_str()) {
            return self.handle_admin(message, body).await;
        }

        // Outside the control channel only an explicit action word counts
        let attempt = if message.channel == self.config.control_channel {
            looks_like_directive(text)
        } else {
            names_action(text)
        };
        if !attempt {
            return Ok(None);
        }

        match self.relay_directive(message).await {
            Ok(report) => Ok(Some(report.summary())),
            Err(e) if e.is_fatal() => Err(e),
            Err(RelayError::UnauthorizedSource(reason)) => {
                warn!(
                    author = %message.author.id,
                    channel = %message.channel,
                    reason = %reason,
                    "directive rejected"
                );
                if self.config.unauthorized_reply {
                    Ok(Some(
                        RelayError::UnauthorizedSource(reason).user_message(),
                    ))
                } else {
                    Ok(None)
                }
            }
            Err(e) => Ok(Some(e.user_message())),
        }
    }

    /// Validate a directive message and propagate it.
    ///
    /// Rejections here never contact a guild.
    pub async fn relay_directive(&self, message: &Message) -> Result<PropagationReport, RelayError> {
        let from_control_channel = message.channel == self.config.control_channel;
        if !from_control_channel {
            return Err(RelayError::UnauthorizedSource(format!(
                "channel {} is not the control channel",
                message.channel
            )));
        }
        if !self.config.privileged_issuers.is_empty()
            && !self.config.privileged_issuers.contains(&message.author.id)
        {
            return Err(RelayError::UnauthorizedSource(format!(
                "user {} may not issue directives",
                message.author.id
            )));
        }

        let request = parse_directive(&message.text, message.author.id, from_control_channel)?;

        let target = self
            .engine
            .bounded(self.platform.resolve_user(request.target))
            .await?
            .ok_or(RelayError::UnknownTarget(request.target))?;

        let request = request
            .with_display_names(message.author.name.clone(), target.name)
            .with_delete_message_days(self.config.delete_message_days);

        self.engine.execute(&request).await
    }

    /// Run a prefixed admin command for the message's guild
    async fn handle_admin(&self, message: &Message, body: &str) -> Result<Option<String>, RelayError> {
        let Some(guild) = message.guild else {
            warn!(author = %message.author.id, "admin command outside a guild ignored");
            return Ok(None);
        };

        let command = match parse_admin_command(body) {
            Ok(command) => command,
            Err(e) => {
                // Non-admins get no feedback at all
                return Ok(message.author_is_admin.then(|| e.to_string()));
            }
        };

        if !message.author_is_admin {
            warn!(
                author = %message.author.id,
                guild = %guild,
                command = command.name(),
                "missing administrator permission for admin command"
            );
            return Ok(None);
        }

        let name = command.name();
        let result = match command {
            AdminCommand::Opt { level } => self.set_opt_level(guild, level),
            AdminCommand::Logging { channel } => self.set_logging(guild, channel).await,
            AdminCommand::Trust { users } => self.trust(guild, &users).await,
            AdminCommand::Untrust { users } => self.untrust(guild, &users).await,
            AdminCommand::Status => Ok(self.status(guild).await),
        };

        match result {
            Ok(reply) => Ok(Some(reply)),
            Err(RelayError::Platform(e)) => {
                warn!(guild = %guild, command = name, error = %e, "admin command lookup failed");
                Ok(Some(ADMIN_PLATFORM_FAILURE.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn set_opt_level(&self, guild: GuildId, level: i64) -> Result<String, RelayError> {
        let Some(tier) = u8::try_from(level).ok().and_then(OptTier::from_level) else {
            return Ok(opt_levels_help());
        };

        self.store.update(guild, |s| s.opt_tier = tier)?;
        info!(guild = %guild, tier = %tier, "opt in level changed");
        Ok(format!("Successfully set opt in level to {}", tier.level()))
    }

    async fn set_logging(
        &self,
        guild: GuildId,
        channel: Option<ChannelId>,
    ) -> Result<String, RelayError> {
        let Some(channel) = channel else {
            self.store.update(guild, |s| s.log_channel_id = None)?;
            info!(guild = %guild, "logging channel cleared");
            return Ok("Logging channel removed".to_string());
        };

        let Some(info) = self
            .engine
            .bounded(self.platform.resolve_channel(guild, channel))
            .await?
        else {
            return Ok("Did not recognize the channel argument".to_string());
        };

        self.store
            .update(guild, |s| s.log_channel_id = Some(channel))?;
        info!(guild = %guild, channel = %channel, "logging channel set");
        Ok(format!("Successfully set logging channel to #{}", info.name))
    }

    /// Display names for `users`; `Err` carries the first unknown id
    async fn resolve_names(&self, users: &[UserId]) -> Result<Vec<(UserId, String)>, RelayError> {
        let mut resolved = Vec::with_capacity(users.len());
        for user in users {
            let info = self
                .engine
                .bounded(self.platform.resolve_user(*user))
                .await?
                .ok_or(RelayError::UnknownTarget(*user))?;
            resolved.push((info.id, info.name));
        }
        Ok(resolved)
    }

    async fn trust(&self, guild: GuildId, users: &[UserId]) -> Result<String, RelayError> {
        let users = match self.resolve_names(users).await {
            Ok(users) => users,
            Err(e @ RelayError::UnknownTarget(_)) => return Ok(e.user_message()),
            Err(e) => return Err(e),
        };

        let already = self.store.get(guild).trusted_issuers;
        let added: Vec<&(UserId, String)> =
            users.iter().filter(|(id, _)| !already.contains(id)).collect();
        if added.is_empty() {
            return Ok(
                "No one new to trust. Have you already marked these people as trusted?"
                    .to_string(),
            );
        }

        self.store.update(guild, |s| {
            s.trusted_issuers.extend(added.iter().map(|(id, _)| *id));
        })?;
        info!(guild = %guild, added = added.len(), "trusted issuers added");

        Ok(format!("Added {} to trusted users", join_names(&added)))
    }

    async fn untrust(&self, guild: GuildId, users: &[UserId]) -> Result<String, RelayError> {
        let users = match self.resolve_names(users).await {
            Ok(users) => users,
            Err(e @ RelayError::UnknownTarget(_)) => return Ok(e.user_message()),
            Err(e) => return Err(e),
        };

        let (removed, not_trusted) = self.store.update(guild, |s| {
            let mut removed = Vec::new();
            let mut not_trusted = Vec::new();
            for entry in &users {
                if s.trusted_issuers.remove(&entry.0) {
                    removed.push(entry);
                } else {
                    not_trusted.push(entry);
                }
            }
            (removed, not_trusted)
        })?;
        info!(guild = %guild, removed = removed.len(), "trusted issuers removed");

        let mut reply = if removed.is_empty() {
            "No one was removed from trusted users".to_string()
        } else {
            format!("Removed {} from trusted users", join_names(&removed))
        };
        if !not_trusted.is_empty() {
            reply.push_str(&format!(
                "\n{} were not trusted users",
                join_names(&not_trusted)
            ));
        }
        Ok(reply)
    }

    /// Read-only summary of one guild's configuration, with warnings for
    /// anything that would make propagation fail there
    async fn status(&self, guild: GuildId) -> String {
        let settings = self.store.get(guild);
        let mut message = String::new();

        match self.engine.bounded(self.platform.can_ban(guild)).await {
            Ok(true) => {}
            Ok(false) => message.push_str(":warning: I do not have permissions to ban members\n"),
            Err(e) => {
                warn!(guild = %guild, error = %e, "could not check ban permission");
                message.push_str(":warning: Could not check my ban permissions\n");
            }
        }

        match settings.log_channel_id {
            Some(channel) => match self
                .engine
                .bounded(self.platform.resolve_channel(guild, channel))
                .await
            {
                Ok(Some(info)) if info.can_send => {
                    message.push_str(&format!("- Logging channel is <#{}>\n", info.id))
                }
                Ok(Some(info)) => message.push_str(&format!(
                    ":warning: I do not have permissions to send messages in <#{}>\n",
                    info.id
                )),
                Ok(None) | Err(_) => {
                    message.push_str(":warning: Could not get the logging channel\n")
                }
            },
            None => message.push_str(":warning: You do not have a logging channel setup.\n"),
        }

        match settings.opt_tier {
            OptTier::NoAction => message
                .push_str("- Opt in level 1, users in the moderator server cannot ban here"),
            OptTier::TrustedOnly => {
                message.push_str(
                    "- Opt in level 2, trusted users in the moderator server can ban here\n\n__Trusted Users__\n",
                );
                for user in &settings.trusted_issuers {
                    let name = match self.engine.bounded(self.platform.resolve_user(*user)).await {
                        Ok(Some(info)) => info.name,
                        _ => format!("User {}", user),
                    };
                    message.push_str(&name);
                    message.push('\n');
                }
            }
            OptTier::AllIssuers => message
                .push_str("- Opt in level 3, all users in the moderator server can ban here"),
        }

        message
    }
}

fn join_names(users: &[&(UserId, String)]) -> String {
    users
        .iter()
        .map(|(_, name)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
