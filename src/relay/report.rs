//! Action requests, per-guild outcomes and the aggregated report.

use crate::platform::{GuildId, GuildInfo, PlatformError, UserId};
use crate::settings::OptTier;
use std::fmt;

/// Default days of message history removed with a ban
pub const DEFAULT_DELETE_MESSAGE_DAYS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Ban,
    Pardon,
}

impl ActionKind {
    /// Past tense for log lines ("banned", "pardoned")
    pub fn past_tense(self) -> &'static str {
        match self {
            ActionKind::Ban => "banned",
            ActionKind::Pardon => "pardoned",
        }
    }

    /// Noun for error lines ("ban", "pardon")
    pub fn noun(self) -> &'static str {
        match self {
            ActionKind::Ban => "ban",
            ActionKind::Pardon => "pardon",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// One ban or pardon to relay to every guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub target: UserId,
    pub reason: String,
    pub issuer: UserId,
    pub issued_from_control_channel: bool,
    pub delete_message_days: u8,
    /// Display names, used only when rendering
    pub issuer_name: Option<String>,
    pub target_name: Option<String>,
}

impl ActionRequest {
    pub fn new(
        kind: ActionKind,
        target: UserId,
        reason: impl Into<String>,
        issuer: UserId,
        issued_from_control_channel: bool,
    ) -> Self {
        Self {
            kind,
            target,
            reason: reason.into(),
            issuer,
            issued_from_control_channel,
            delete_message_days: DEFAULT_DELETE_MESSAGE_DAYS,
            issuer_name: None,
            target_name: None,
        }
    }

    pub fn with_display_names(
        mut self,
        issuer_name: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        self.issuer_name = Some(issuer_name.into());
        self.target_name = Some(target_name.into());
        self
    }

    pub fn with_delete_message_days(mut self, days: u8) -> Self {
        self.delete_message_days = days;
        self
    }

    pub fn issuer_display(&self) -> String {
        self.issuer_name
            .clone()
            .unwrap_or_else(|| format!("User {}", self.issuer))
    }

    pub fn target_display(&self) -> String {
        self.target_name
            .clone()
            .unwrap_or_else(|| format!("User {}", self.target))
    }

    /// Opening sentence shared by every log line for this request
    pub fn headline(&self) -> String {
        format!(
            "{} has {} {} ({}) for {}.",
            self.issuer_display(),
            self.kind.past_tense(),
            self.target_display(),
            self.target,
            self.reason
        )
    }
}

/// What happened in one guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDecision {
    /// The moderation API call succeeded
    Executed,
    /// Recorded only, nothing was executed
    LoggedOnly,
    /// The action was attempted and failed, or was refused outright
    Denied,
}

/// Result of relaying one request to one guild
///
/// Action failures and log-post failures are kept apart: a log failure
/// never changes `decision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildOutcome {
    pub guild_id: GuildId,
    pub guild_name: String,
    /// Tier the decision was made under
    pub tier: OptTier,
    pub decision: OutcomeDecision,
    pub api_error: Option<PlatformError>,
    pub log_error: Option<PlatformError>,
    /// A log line was posted successfully
    pub logged: bool,
}

impl GuildOutcome {
    pub fn new(guild: &GuildInfo, tier: OptTier, decision: OutcomeDecision) -> Self {
        Self {
            guild_id: guild.id,
            guild_name: guild.name.clone(),
            tier,
            decision,
            api_error: None,
            log_error: None,
            logged: false,
        }
    }

    /// Log-channel text for this outcome
    pub fn log_line(&self, request: &ActionRequest) -> String {
        let verb = request.kind.past_tense();
        let issuer = request.issuer_display();

        let note = match (self.tier, self.decision) {
            (OptTier::NoAction, _) => format!(
                "**This user has not been {} here since you have not opted into bans.**",
                verb
            ),
            (OptTier::TrustedOnly, OutcomeDecision::Executed) => {
                format!("**This user was {} here since {} is trusted**", verb, issuer)
            }
            (OptTier::TrustedOnly, _) => format!(
                "**This user was not {} here since {} is not trusted**",
                verb, issuer
            ),
            (OptTier::AllIssuers, OutcomeDecision::Executed) => {
                format!("**This user has been {} here**", verb)
            }
            (OptTier::AllIssuers, _) => format!("**This user has not been {} here**", verb),
        };

        format!("{} {}", request.headline(), note)
    }

    /// Error lines for the issuer-facing error block
    fn error_lines(&self, kind: ActionKind) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(err) = &self.api_error {
            lines.push(match err {
                PlatformError::PermissionDenied(_) => {
                    format!("Missing {} permissions in {}", kind.noun(), self.guild_name)
                }
                PlatformError::Timeout(_) => {
                    format!("The {} timed out in {}", kind.noun(), self.guild_name)
                }
                other => format!("Could not {} in {}: {}", kind.noun(), self.guild_name, other),
            });
        }

        if let Some(err) = &self.log_error {
            lines.push(match err {
                PlatformError::PermissionDenied(_) => format!(
                    "Missing permissions to send logging message in {}",
                    self.guild_name
                ),
                PlatformError::NotFound(_) => {
                    format!("Could not find the logging channel in {}", self.guild_name)
                }
                PlatformError::Timeout(_) => {
                    format!("Logging message timed out in {}", self.guild_name)
                }
                other => format!(
                    "Could not send logging message in {}: {}",
                    self.guild_name, other
                ),
            });
        }

        lines
    }
}

/// Outcome of one propagation, one entry per guild in directory order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationReport {
    kind: ActionKind,
    target: UserId,
    target_display: String,
    outcomes: Vec<GuildOutcome>,
}

impl PropagationReport {
    pub fn new(request: &ActionRequest, outcomes: Vec<GuildOutcome>) -> Self {
        Self {
            kind: request.kind,
            target: request.target,
            target_display: request.target_display(),
            outcomes,
        }
    }

    pub fn outcomes(&self) -> &[GuildOutcome] {
        &self.outcomes
    }

    pub fn outcome_for(&self, guild: GuildId) -> Option<&GuildOutcome> {
        self.outcomes.iter().find(|o| o.guild_id == guild)
    }

    pub fn count(&self, decision: OutcomeDecision) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision == decision)
            .count()
    }

    /// Every per-guild error as a plain-text line
    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|o| o.error_lines(self.kind))
            .collect()
    }

    /// Consolidated issuer-facing summary.
    ///
    /// The error block is appended only when there is at least one error.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} {} ({}) across {} servers: {} executed, {} logged only, {} failed.",
            capitalize(self.kind.past_tense()),
            self.target_display,
            self.target,
            self.outcomes.len(),
            self.count(OutcomeDecision::Executed),
            self.count(OutcomeDecision::LoggedOnly),
            self.count(OutcomeDecision::Denied),
        );

        let errors = self.errors();
        if !errors.is_empty() {
            text.push_str("\n\n**Errors**\n");
            text.push_str(&errors.join("\n"));
        }
        text
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
