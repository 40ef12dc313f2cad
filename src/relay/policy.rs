//! Authorization policy: should a relayed action run in a guild?
//!
//! Pure function of the issuer and the acting guild's own settings. One
//! guild's tier never influences another guild's decision.

use crate::platform::UserId;
use crate::settings::{GuildSettings, OptTier};

/// Per-guild decision for one relayed action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Call the moderation API in this guild
    Execute,
    /// Record the action in the guild's log channel only
    LogOnly,
    /// Do nothing in this guild
    Deny,
}

/// Decide what a relayed action does in one guild.
///
/// `has_admin_override` belongs to server-admin commands, which change
/// settings directly and never go through propagation; a relayed action
/// that claims it is denied.
pub fn decide(issuer: UserId, settings: &GuildSettings, has_admin_override: bool) -> Decision {
    if has_admin_override {
        return Decision::Deny;
    }

    match settings.opt_tier {
        OptTier::NoAction => Decision::LogOnly,
        OptTier::TrustedOnly if settings.is_trusted(issuer) => Decision::Execute,
        OptTier::TrustedOnly => Decision::LogOnly,
        OptTier::AllIssuers => Decision::Execute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tier: OptTier, trusted: &[u64]) -> GuildSettings {
        GuildSettings {
            opt_tier: tier,
            trusted_issuers: trusted.iter().copied().map(UserId).collect(),
            log_channel_id: None,
        }
    }

    #[test]
    fn test_no_action_only_logs() {
        // Even a trusted issuer cannot act in a guild that has not opted in
        let s = settings(OptTier::NoAction, &[7]);
        assert_eq!(decide(UserId(7), &s, false), Decision::LogOnly);
        assert_eq!(decide(UserId(8), &s, false), Decision::LogOnly);
    }

    #[test]
    fn test_trusted_only() {
        let s = settings(OptTier::TrustedOnly, &[7]);
        assert_eq!(decide(UserId(7), &s, false), Decision::Execute);
        assert_eq!(decide(UserId(8), &s, false), Decision::LogOnly);
    }

    #[test]
    fn test_trusted_only_with_empty_list() {
        let s = settings(OptTier::TrustedOnly, &[]);
        assert_eq!(decide(UserId(7), &s, false), Decision::LogOnly);
    }

    #[test]
    fn test_all_issuers() {
        let s = settings(OptTier::AllIssuers, &[]);
        assert_eq!(decide(UserId(7), &s, false), Decision::Execute);
        assert_eq!(decide(UserId(8), &s, false), Decision::Execute);
    }

    #[test]
    fn test_admin_override_never_reaches_propagation() {
        for tier in [OptTier::NoAction, OptTier::TrustedOnly, OptTier::AllIssuers] {
            let s = settings(tier, &[7]);
            assert_eq!(decide(UserId(7), &s, true), Decision::Deny);
        }
    }
}
