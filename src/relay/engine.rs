//! Propagation Engine
//!
//! Relays one ban/pardon to every guild the directory knows:
//! 1. Read the guild's settings (defaults if none)
//! 2. Ask the policy whether to execute or only log
//! 3. Call the moderation API when executing
//! 4. Post a log line if the guild configured a log channel
//! 5. Record a `GuildOutcome` in that guild's slot of the report
//!
//! Failures inside one guild are recorded in its outcome and never stop
//! the other guilds. Only a request from the wrong source or a failure to
//! enumerate guilds aborts the whole propagation.

use super::policy::{decide, Decision};
use super::report::{ActionKind, ActionRequest, GuildOutcome, OutcomeDecision, PropagationReport};
use crate::commands::DirectiveError;
use crate::platform::{ChannelId, GuildInfo, Platform, PlatformError, PlatformResult, UserId};
use crate::settings::{ConfigStore, StoreError};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on every collaborator call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of guilds processed at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on each directory / moderation / messaging call.
    /// Expiry counts as a failed call for that guild.
    pub call_timeout: Duration,
    /// Guilds processed concurrently (at least 1)
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Fans one action out to every known guild
pub struct PropagationEngine<P: Platform> {
    platform: P,
    store: Arc<ConfigStore>,
    config: EngineConfig,
}

impl<P: Platform> PropagationEngine<P> {
    pub fn new(platform: P, store: Arc<ConfigStore>, config: EngineConfig) -> Self {
        Self {
            platform,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Relay `request` to every guild and report what happened in each.
    ///
    /// Runs to completion across all guilds; partial failures are in the
    /// report, not in the error.
    pub async fn execute(&self, request: &ActionRequest) -> Result<PropagationReport, RelayError> {
        if !request.issued_from_control_channel {
            warn!(issuer = %request.issuer, "directive rejected: not issued from control channel");
            return Err(RelayError::UnauthorizedSource(
                "not issued from the control channel".to_string(),
            ));
        }

        let guilds = self.bounded(self.platform.guilds()).await?;

        info!(
            kind = %request.kind,
            target = %request.target,
            issuer = %request.issuer,
            guilds = guilds.len(),
            "propagating action"
        );

        // `buffered` yields in input order, so each guild keeps its slot
        let outcomes: Vec<GuildOutcome> = futures::stream::iter(
            guilds
                .into_iter()
                .map(|guild| self.propagate_to(guild, request)),
        )
        .buffered(self.config.max_concurrency.max(1))
        .collect()
        .await;

        let report = PropagationReport::new(request, outcomes);
        info!(
            executed = report.count(OutcomeDecision::Executed),
            logged_only = report.count(OutcomeDecision::LoggedOnly),
            denied = report.count(OutcomeDecision::Denied),
            "propagation complete"
        );
        Ok(report)
    }

    /// Handle one guild. Never fails: every error lands in the outcome.
    async fn propagate_to(&self, guild: GuildInfo, request: &ActionRequest) -> GuildOutcome {
        // One coherent copy of this guild's settings for the whole step
        let settings = self.store.get(guild.id);
        let decision = decide(request.issuer, &settings, false);
        debug!(guild = %guild.id, tier = %settings.opt_tier, ?decision, "policy decision");

        let mut outcome = match decision {
            Decision::Execute => match self.moderate(&guild, request).await {
                Ok(()) => GuildOutcome::new(&guild, settings.opt_tier, OutcomeDecision::Executed),
                Err(e) => {
                    warn!(guild = %guild.id, error = %e, "moderation call failed");
                    let mut outcome =
                        GuildOutcome::new(&guild, settings.opt_tier, OutcomeDecision::Denied);
                    outcome.api_error = Some(e);
                    outcome
                }
            },
            Decision::LogOnly => {
                GuildOutcome::new(&guild, settings.opt_tier, OutcomeDecision::LoggedOnly)
            }
            Decision::Deny => GuildOutcome::new(&guild, settings.opt_tier, OutcomeDecision::Denied),
        };

        // A failed action is reported to the issuer only, not to the guild
        if outcome.decision != OutcomeDecision::Denied {
            if let Some(channel) = settings.log_channel_id {
                let line = outcome.log_line(request);
                match self.post_log(&guild, channel, &line).await {
                    Ok(()) => outcome.logged = true,
                    Err(e) => {
                        warn!(guild = %guild.id, channel = %channel, error = %e, "log post failed");
                        outcome.log_error = Some(e);
                    }
                }
            }
        }

        outcome
    }

    async fn moderate(&self, guild: &GuildInfo, request: &ActionRequest) -> PlatformResult<()> {
        match request.kind {
            ActionKind::Ban => {
                self.bounded(self.platform.ban(
                    guild.id,
                    request.target,
                    &request.reason,
                    request.delete_message_days,
                ))
                .await
            }
            ActionKind::Pardon => {
                self.bounded(
                    self.platform
                        .unban(guild.id, request.target, &request.reason),
                )
                .await
            }
        }
    }

    async fn post_log(
        &self,
        guild: &GuildInfo,
        channel: ChannelId,
        text: &str,
    ) -> PlatformResult<()> {
        let resolved = self
            .bounded(self.platform.resolve_channel(guild.id, channel))
            .await?;
        if resolved.is_none() {
            return Err(PlatformError::NotFound(format!("log channel {}", channel)));
        }
        self.bounded(self.platform.send_message(channel, text))
            .await
    }

    /// Bound a collaborator call by `call_timeout`
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = PlatformResult<T>>,
    ) -> PlatformResult<T> {
        let limit = self.config.call_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(PlatformError::Timeout(limit)))
    }
}

/// Errors that reject a request as a whole
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed request: {0}")]
    Malformed(#[from] DirectiveError),

    #[error("Unauthorized source: {0}")]
    UnauthorizedSource(String),

    #[error("Unknown target user {0}")]
    UnknownTarget(UserId),

    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl RelayError {
    /// Plain text suitable for the issuer
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Malformed(e) => e.to_string(),
            RelayError::UnauthorizedSource(_) => {
                "Ban and pardon directives are only accepted in the control channel.".to_string()
            }
            RelayError::UnknownTarget(user) => format!("Could not find a user with id {}", user),
            RelayError::Store(_) => {
                "Settings could not be saved, nothing was changed. Please try again later."
                    .to_string()
            }
            RelayError::Platform(_) => {
                "Could not reach the chat platform, no server was contacted. Please try again."
                    .to_string()
            }
        }
    }

    /// Errors after which the process must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Store(_))
    }
}
