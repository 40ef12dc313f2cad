//! Property-based tests for the settings store
//!
//! - Round-trip: save then load yields the saved table
//! - Isolation: an update touches exactly one guild's record

use super::{ConfigStore, GuildSettings, OptTier};
use crate::platform::{ChannelId, GuildId, UserId};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn arb_tier() -> impl Strategy<Value = OptTier> {
    prop_oneof![
        Just(OptTier::NoAction),
        Just(OptTier::TrustedOnly),
        Just(OptTier::AllIssuers),
    ]
}

fn arb_settings() -> impl Strategy<Value = GuildSettings> {
    (
        arb_tier(),
        prop::collection::btree_set(any::<u64>(), 0..8),
        prop::option::of(any::<u64>()),
    )
        .prop_map(|(opt_tier, trusted, log)| GuildSettings {
            opt_tier,
            trusted_issuers: trusted.into_iter().map(UserId).collect::<BTreeSet<_>>(),
            log_channel_id: log.map(ChannelId),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: save followed by load returns exactly what was saved
    #[test]
    fn save_load_round_trip(
        table in prop::collection::btree_map(any::<u64>(), arb_settings(), 0..16),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = ConfigStore::load(&path).unwrap();

        for (id, settings) in &table {
            let settings = settings.clone();
            store.update(GuildId(*id), move |s| *s = settings).unwrap();
        }
        store.save().unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        prop_assert_eq!(reloaded.snapshot(), store.snapshot());
        prop_assert_eq!(reloaded.snapshot().len(), table.len());
    }

    /// Property: updating one guild never changes another guild's record
    #[test]
    fn update_is_guild_local(
        a in arb_settings(),
        b in arb_settings(),
        replacement in arb_settings(),
    ) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path().join("settings.json")).unwrap();

        store.update(GuildId(1), |s| *s = a.clone()).unwrap();
        store.update(GuildId(2), |s| *s = b.clone()).unwrap();
        store.update(GuildId(1), |s| *s = replacement.clone()).unwrap();

        prop_assert_eq!(store.get(GuildId(1)), replacement);
        prop_assert_eq!(store.get(GuildId(2)), b);
    }
}
