//! Guild Settings Store
//!
//! Durable map of guild id -> `GuildSettings`, persisted as one JSON file:
//!
//! ```json
//! { "guilds": { "123": { "opt_tier": 2, "trusted_issuers": [7], "log_channel_id": 99 } } }
//! ```
//!
//! The file is replaced wholesale on every change (temp file in the same
//! directory, fsync, rename), so a reader sees either the old table or the
//! new one. The in-memory table is only updated after the write succeeds,
//! which keeps memory and disk equal even when a save fails.

use super::guild::GuildSettings;
use crate::platform::GuildId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// On-disk layout
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    guilds: BTreeMap<GuildId, GuildSettings>,
}

/// Shared, persisted guild settings table
///
/// Share it as `Arc<ConfigStore>`; all methods take `&self`.
pub struct ConfigStore {
    path: PathBuf,
    guilds: RwLock<BTreeMap<GuildId, GuildSettings>>,
}

impl ConfigStore {
    /// Load the table from `path`.
    ///
    /// A missing file is a first run and yields an empty table. A file that
    /// exists but does not parse is `StoreError::Corrupt`; callers must not
    /// carry on with an empty table in that case.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let guilds = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: SettingsFile =
                serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            file.guilds
        } else {
            debug!(path = %path.display(), "no settings file yet, starting empty");
            BTreeMap::new()
        };

        info!(path = %path.display(), guilds = guilds.len(), "loaded guild settings");

        Ok(Self {
            path,
            guilds: RwLock::new(guilds),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings for `guild`, or the defaults if the guild has no record.
    ///
    /// Returns an owned copy taken under the read lock, so the caller sees
    /// one coherent version even while an admin change is being saved.
    pub fn get(&self, guild: GuildId) -> GuildSettings {
        // Writers only ever publish a fully built table, so a poisoned lock
        // still guards consistent data.
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        guilds.get(&guild).cloned().unwrap_or_default()
    }

    /// Whether `guild` has a record
    pub fn contains(&self, guild: GuildId) -> bool {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        guilds.contains_key(&guild)
    }

    /// Copy of the whole table
    pub fn snapshot(&self) -> BTreeMap<GuildId, GuildSettings> {
        self.guilds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist the current table.
    ///
    /// Safe to call repeatedly; each call atomically replaces the file.
    pub fn save(&self) -> Result<(), StoreError> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        write_atomic(&self.path, &guilds)
    }

    /// Insert default settings for `guild` if it has none, and persist.
    ///
    /// Returns `true` if a record was created.
    pub fn ensure_default(&self, guild: GuildId) -> Result<bool, StoreError> {
        Ok(self.ensure_defaults([guild])? == 1)
    }

    /// Insert defaults for every listed guild without a record, with a
    /// single save. Returns how many records were created.
    pub fn ensure_defaults(
        &self,
        guild_ids: impl IntoIterator<Item = GuildId>,
    ) -> Result<usize, StoreError> {
        let mut guilds = self.guilds.write().unwrap_or_else(PoisonError::into_inner);

        let missing: Vec<GuildId> = guild_ids
            .into_iter()
            .filter(|id| !guilds.contains_key(id))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let mut next = guilds.clone();
        for id in &missing {
            next.insert(*id, GuildSettings::default());
        }
        write_atomic(&self.path, &next)?;
        *guilds = next;

        for id in &missing {
            info!(guild = %id, "initialized default guild settings");
        }
        Ok(missing.len())
    }

    /// Apply `change` to one guild's settings and persist the whole table.
    ///
    /// The write lock is held from copy to publish, so concurrent readers
    /// see either the old or the new record and concurrent updates are
    /// serialized. If the save fails nothing is published.
    pub fn update<R>(
        &self,
        guild: GuildId,
        change: impl FnOnce(&mut GuildSettings) -> R,
    ) -> Result<R, StoreError> {
        let mut guilds = self.guilds.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = guilds.clone();
        let result = change(next.entry(guild).or_default());
        write_atomic(&self.path, &next)?;
        *guilds = next;

        Ok(result)
    }
}

/// Serialize `guilds` and atomically replace `path` with it
fn write_atomic(path: &Path, guilds: &BTreeMap<GuildId, GuildSettings>) -> Result<(), StoreError> {
    #[derive(Serialize)]
    struct SettingsFileRef<'a> {
        guilds: &'a BTreeMap<GuildId, GuildSettings>,
    }

    let contents = serde_json::to_string_pretty(&SettingsFileRef { guilds })
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Same directory as the target so the rename stays on one filesystem
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    debug!(path = %path.display(), guilds = guilds.len(), "saved guild settings");
    Ok(())
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Settings store {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChannelId, UserId};
    use crate::settings::OptTier;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.snapshot().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let result = ConfigStore::load(&path);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_load_rejects_invalid_tier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"guilds": {"1": {"opt_tier": 9, "trusted_issuers": [], "log_channel_id": null}}}"#,
        )
        .unwrap();

        assert!(matches!(
            ConfigStore::load(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_get_unknown_guild_is_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get(GuildId(42)), GuildSettings::default());
        assert!(!store.contains(GuildId(42)));
    }

    #[test]
    fn test_ensure_default_persists_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.ensure_default(GuildId(1)).unwrap());
        assert!(!store.ensure_default(GuildId(1)).unwrap());

        let reloaded = store_in(&dir);
        assert!(reloaded.contains(GuildId(1)));
        assert_eq!(reloaded.get(GuildId(1)), GuildSettings::default());
    }

    #[test]
    fn test_ensure_default_keeps_existing_settings() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .update(GuildId(1), |s| s.opt_tier = OptTier::AllIssuers)
            .unwrap();
        assert!(!store.ensure_default(GuildId(1)).unwrap());
        assert_eq!(store.get(GuildId(1)).opt_tier, OptTier::AllIssuers);
    }

    #[test]
    fn test_ensure_defaults_batch() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_default(GuildId(2)).unwrap();

        let created = store
            .ensure_defaults([GuildId(1), GuildId(2), GuildId(3)])
            .unwrap();
        assert_eq!(created, 2);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn test_update_persists_whole_table() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .update(GuildId(1), |s| {
                s.opt_tier = OptTier::TrustedOnly;
                s.trusted_issuers.insert(UserId(7));
            })
            .unwrap();
        store
            .update(GuildId(2), |s| s.log_channel_id = Some(ChannelId(99)))
            .unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert!(reloaded.get(GuildId(1)).is_trusted(UserId(7)));
        assert_eq!(reloaded.get(GuildId(2)).log_channel_id, Some(ChannelId(99)));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let inserted = store
            .update(GuildId(1), |s| s.trusted_issuers.insert(UserId(7)))
            .unwrap();
        assert!(inserted);
        let inserted = store
            .update(GuildId(1), |s| s.trusted_issuers.insert(UserId(7)))
            .unwrap();
        assert!(!inserted);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .update(GuildId(5), |s| {
                s.opt_tier = OptTier::AllIssuers;
                s.log_channel_id = Some(ChannelId(1));
            })
            .unwrap();

        store.save().unwrap();
        store.save().unwrap();

        assert_eq!(store_in(&dir).snapshot(), store.snapshot());
    }

    #[test]
    fn test_failed_save_does_not_publish() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("settings.json");
        fs::create_dir(&path).unwrap();
        let store = ConfigStore {
            path,
            guilds: RwLock::new(BTreeMap::new()),
        };

        let result = store.update(GuildId(1), |s| s.opt_tier = OptTier::AllIssuers);
        assert!(result.is_err());
        assert!(!store.contains(GuildId(1)));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for i in 0..5 {
            store.ensure_default(GuildId(i)).unwrap();
        }

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..10u64 {
                        store
                            .update(GuildId(1), |s| {
                                s.trusted_issuers.insert(UserId(i * 100 + j));
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(GuildId(1)).trusted_issuers.len(), 80);
        assert_eq!(store_in(&dir).get(GuildId(1)).trusted_issuers.len(), 80);
    }
}
