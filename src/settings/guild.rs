//! Per-guild relay settings.

use crate::platform::{ChannelId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How much a guild trusts the control channel.
///
/// Persisted and shown to admins as the levels 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptTier {
    /// Level 1: only log, never act
    #[default]
    NoAction,
    /// Level 2: act on directives from trusted issuers
    TrustedOnly,
    /// Level 3: act on every directive
    AllIssuers,
}

impl OptTier {
    /// Admin-facing level number
    pub fn level(self) -> u8 {
        match self {
            OptTier::NoAction => 1,
            OptTier::TrustedOnly => 2,
            OptTier::AllIssuers => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(OptTier::NoAction),
            2 => Some(OptTier::TrustedOnly),
            3 => Some(OptTier::AllIssuers),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OptTier::NoAction => "Only logging - no bans",
            OptTier::TrustedOnly => "Bans from trusted users only",
            OptTier::AllIssuers => "Bans from all users in the moderator server",
        }
    }
}

impl From<OptTier> for u8 {
    fn from(tier: OptTier) -> u8 {
        tier.level()
    }
}

impl TryFrom<u8> for OptTier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        OptTier::from_level(level).ok_or_else(|| format!("invalid opt tier {} (expected 1-3)", level))
    }
}

impl fmt::Display for OptTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Settings for one guild. Missing fields load as their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub opt_tier: OptTier,
    pub trusted_issuers: BTreeSet<UserId>,
    pub log_channel_id: Option<ChannelId>,
}

impl GuildSettings {
    pub fn is_trusted(&self, issuer: UserId) -> bool {
        self.trusted_issuers.contains(&issuer)
    }
}
