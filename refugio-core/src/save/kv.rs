//! Key-value save store with a byte quota.
//!
//! Every value is a JSON document stored under an owner-scoped key:
//!
//! | Key                            | Value                          |
//! |--------------------------------|--------------------------------|
//! | `refugio:{owner}:index`        | manual-save metadata, newest first |
//! | `refugio:{owner}:save:{id}`    | one manual [`SavedGame`]       |
//! | `refugio:{owner}:autosave`     | the single auto-save slot      |
//! | `refugio:{owner}:endings`      | unlocked endings, newest first |
//!
//! Usage is the sum of key and value lengths. A write that would push usage
//! past the quota fails with [`RefugioError::StorageFull`] and leaves the
//! store untouched.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    ensure_known_ending, resolve_save_name, EndingLedger, SaveMetadata, SaveStore, SavedGame,
    SessionSnapshot, UnlockedEnding,
};
use crate::config::SaveConfig;
use crate::error::{RefugioError, Result};
use crate::types::{OwnerId, SaveId};

/// Format version written by this backend.
pub const KV_SAVE_VERSION: &str = "1.0.0";

const KEY_PREFIX: &str = "refugio";

/// Quota usage report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageStats {
    /// KiB in use, rounded to two decimals.
    pub used_kib: f64,
    /// Quota in KiB, rounded to two decimals.
    pub total_kib: f64,
    /// `used / total * 100`, rounded to two decimals.
    pub percentage: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
struct KvState {
    entries: BTreeMap<String, String>,
    used: usize,
}

/// Pending change to one key. `None` deletes it.
type PendingWrite = (String, Option<String>);

impl KvState {
    fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(Into::into)
    }

    /// Apply all writes or none of them.
    fn commit(&mut self, writes: Vec<PendingWrite>, quota: usize) -> Result<()> {
        let mut released = 0usize;
        let mut added = 0usize;
        for (key, value) in &writes {
            if let Some(old) = self.entries.get(key) {
                released += key.len() + old.len();
            }
            if let Some(new) = value {
                added += key.len() + new.len();
            }
        }

        let base = self.used.saturating_sub(released);
        if base + added > quota {
            return Err(RefugioError::StorageFull {
                needed: added,
                available: quota.saturating_sub(base),
            });
        }

        for (key, value) in writes {
            match value {
                Some(v) => {
                    self.entries.insert(key, v);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
        self.used = base + added;
        Ok(())
    }
}

/// In-process key-value save store.
///
/// Thread-safe: all access goes through one [`parking_lot::Mutex`].
#[derive(Debug)]
pub struct KvSaveStore {
    state: Mutex<KvState>,
    config: SaveConfig,
}

impl KvSaveStore {
    /// Empty store using the caps and quota from `config`.
    #[must_use]
    pub fn new(config: &SaveConfig) -> Self {
        Self {
            state: Mutex::new(KvState::default()),
            config: config.clone(),
        }
    }

    fn index_key(owner: &OwnerId) -> String {
        format!("{KEY_PREFIX}:{owner}:index")
    }

    fn save_key(owner: &OwnerId, id: SaveId) -> String {
        format!("{KEY_PREFIX}:{owner}:save:{id}")
    }

    fn auto_key(owner: &OwnerId) -> String {
        format!("{KEY_PREFIX}:{owner}:autosave")
    }

    fn endings_key(owner: &OwnerId) -> String {
        format!("{KEY_PREFIX}:{owner}:endings")
    }

    /// Bytes currently in use.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.state.lock().used
    }

    /// Usage against the quota.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn storage_stats(&self) -> StorageStats {
        let used = self.used_bytes() as f64;
        let total = self.config.kv_quota_bytes as f64;
        let percentage = if total > 0.0 { used / total * 100.0 } else { 100.0 };
        StorageStats {
            used_kib: round2(used / 1024.0),
            total_kib: round2(total / 1024.0),
            percentage: round2(percentage),
        }
    }

    /// Reject saves that cannot belong to `owner` or are malformed.
    fn validate(owner: &OwnerId, save_id: Option<SaveId>, saved: SavedGame) -> Result<SavedGame> {
        if &saved.owner != owner || save_id.is_some_and(|id| id != saved.id) {
            return Err(RefugioError::SaveNotFound {
                owner: owner.clone(),
                save: save_id.unwrap_or(saved.id),
            });
        }
        if saved.name.trim().is_empty() {
            return Err(RefugioError::InvalidSave(format!(
                "save {} has no name",
                saved.id
            )));
        }
        if saved.version != KV_SAVE_VERSION {
            warn!(
                save = %saved.id,
                found = %saved.version,
                expected = KV_SAVE_VERSION,
                "Save version mismatch"
            );
        }
        Ok(saved)
    }
}

impl SaveStore for KvSaveStore {
    fn save(
        &self,
        owner: &OwnerId,
        snapshot: &SessionSnapshot,
        name: &str,
        is_auto_save: bool,
    ) -> Result<SavedGame> {
        let now = Utc::now();
        let name = resolve_save_name(name, is_auto_save, now)?;
        let saved = SavedGame::from_snapshot(owner, snapshot, name, is_auto_save, KV_SAVE_VERSION, now);
        let body = serde_json::to_string(&saved)?;

        let mut state = self.state.lock();

        if is_auto_save {
            state.commit(vec![(Self::auto_key(owner), Some(body))], self.config.kv_quota_bytes)?;
            debug!(owner = %owner, save = %saved.id, "Auto-save slot overwritten");
            return Ok(saved);
        }

        let index_key = Self::index_key(owner);
        let mut index: Vec<SaveMetadata> = state.get(&index_key)?.unwrap_or_default();
        index.insert(0, saved.metadata());

        let mut writes = vec![(Self::save_key(owner, saved.id), Some(body))];
        let cap = self.config.max_manual_saves.max(1);
        while index.len() > cap {
            if let Some(evicted) = index.pop() {
                debug!(owner = %owner, save = %evicted.id, "Evicting oldest manual save");
                writes.push((Self::save_key(owner, evicted.id), None));
            }
        }
        writes.push((index_key, Some(serde_json::to_string(&index)?)));

        state.commit(writes, self.config.kv_quota_bytes)?;
        debug!(owner = %owner, save = %saved.id, used = state.used, "Saved game");
        Ok(saved)
    }

    fn load(&self, owner: &OwnerId, save_id: SaveId) -> Result<SavedGame> {
        let state = self.state.lock();

        if let Some(saved) = state.get::<SavedGame>(&Self::save_key(owner, save_id))? {
            return Self::validate(owner, Some(save_id), saved);
        }
        if let Some(auto) = state.get::<SavedGame>(&Self::auto_key(owner))? {
            if auto.id == save_id {
                return Self::validate(owner, Some(save_id), auto);
            }
        }

        Err(RefugioError::SaveNotFound {
            owner: owner.clone(),
            save: save_id,
        })
    }

    fn list(&self, owner: &OwnerId) -> Result<Vec<SaveMetadata>> {
        let state = self.state.lock();
        let mut saves: Vec<SaveMetadata> = state.get(&Self::index_key(owner))?.unwrap_or_default();
        if let Some(auto) = state.get::<SavedGame>(&Self::auto_key(owner))? {
            saves.push(auto.metadata());
        }
        saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(saves)
    }

    fn delete(&self, owner: &OwnerId, save_id: SaveId) -> Result<()> {
        let mut state = self.state.lock();

        let save_key = Self::save_key(owner, save_id);
        if state.entries.contains_key(&save_key) {
            let index_key = Self::index_key(owner);
            let mut index: Vec<SaveMetadata> = state.get(&index_key)?.unwrap_or_default();
            index.retain(|m| m.id != save_id);
            let writes = vec![
                (save_key, None),
                (index_key, Some(serde_json::to_string(&index)?)),
            ];
            state.commit(writes, self.config.kv_quota_bytes)?;
            debug!(owner = %owner, save = %save_id, "Deleted save");
            return Ok(());
        }

        let auto_key = Self::auto_key(owner);
        if let Some(auto) = state.get::<SavedGame>(&auto_key)? {
            if auto.id == save_id {
                state.commit(vec![(auto_key, None)], self.config.kv_quota_bytes)?;
                debug!(owner = %owner, save = %save_id, "Cleared auto-save slot");
                return Ok(());
            }
        }

        Err(RefugioError::SaveNotFound {
            owner: owner.clone(),
            save: save_id,
        })
    }

    fn latest_auto_save(&self, owner: &OwnerId) -> Result<Option<SavedGame>> {
        let state = self.state.lock();
        state
            .get::<SavedGame>(&Self::auto_key(owner))?
            .map(|auto| Self::validate(owner, None, auto))
            .transpose()
    }

    fn count_manual_saves(&self, owner: &OwnerId) -> Result<usize> {
        let state = self.state.lock();
        let index: Vec<SaveMetadata> = state.get(&Self::index_key(owner))?.unwrap_or_default();
        Ok(index.len())
    }
}

impl EndingLedger for KvSaveStore {
    fn unlock_ending(&self, owner: &OwnerId, ending_id: &str) -> Result<bool> {
        ensure_known_ending(ending_id)?;

        let mut state = self.state.lock();
        let key = Self::endings_key(owner);
        let mut unlocked: Vec<UnlockedEnding> = state.get(&key)?.unwrap_or_default();
        if unlocked.iter().any(|u| u.ending_id == ending_id) {
            return Ok(false);
        }

        unlocked.insert(
            0,
            UnlockedEnding {
                ending_id: ending_id.to_string(),
                achieved_at: Utc::now(),
            },
        );
        state.commit(
            vec![(key, Some(serde_json::to_string(&unlocked)?))],
            self.config.kv_quota_bytes,
        )?;
        info!(owner = %owner, ending = ending_id, "Ending unlocked");
        Ok(true)
    }

    fn unlocked_endings(&self, owner: &OwnerId) -> Result<Vec<UnlockedEnding>> {
        let state = self.state.lock();
        Ok(state.get(&Self::endings_key(owner))?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::GameStatistics;
    use crate::types::GameMessage;

    fn snapshot(turns: u32, text: &str) -> SessionSnapshot {
        let mut statistics = GameStatistics::default();
        statistics.turns_played = turns;
        SessionSnapshot {
            messages: vec![GameMessage::assistant(text)],
            inventory: vec![],
            statistics,
        }
    }

    #[test]
    fn manual_saves_are_capped_oldest_first() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let owner = OwnerId::new("ana");
        let first = store.save(&owner, &snapshot(1, "uno"), "Uno", false).expect("save");
        for i in 2..=6 {
            store
                .save(&owner, &snapshot(i, "otro"), &format!("Save {i}"), false)
                .expect("save");
        }
        assert_eq!(store.count_manual_saves(&owner).expect("count"), 5);
        assert!(store.load(&owner, first.id).expect_err("evicted").is_not_found());
    }

    #[test]
    fn single_auto_slot_is_overwritten() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let owner = OwnerId::new("ana");
        let a = store.save(&owner, &snapshot(5, "a"), "", true).expect("auto");
        let b = store.save(&owner, &snapshot(10, "b"), "", true).expect("auto");

        assert!(store.load(&owner, a.id).expect_err("replaced").is_not_found());
        let latest = store.latest_auto_save(&owner).expect("latest").expect("some");
        assert_eq!(latest.id, b.id);
        assert_eq!(latest.version, KV_SAVE_VERSION);

        let listed = store.list(&owner).expect("list");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_auto_save);
    }

    #[test]
    fn other_owners_cannot_see_saves() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let ana = OwnerId::new("ana");
        let bob = OwnerId::new("bob");
        let saved = store.save(&ana, &snapshot(1, "x"), "Ana", false).expect("save");

        assert!(store.load(&bob, saved.id).expect_err("foreign").is_not_found());
        assert!(store.delete(&bob, saved.id).expect_err("foreign").is_not_found());
        assert!(store.list(&bob).expect("list").is_empty());
        store.delete(&ana, saved.id).expect("own delete");
        assert!(store.list(&ana).expect("list").is_empty());
    }

    #[test]
    fn quota_exceeded_leaves_store_untouched() {
        let config = SaveConfig {
            kv_quota_bytes: 2_048,
            ..SaveConfig::default()
        };
        let store = KvSaveStore::new(&config);
        let owner = OwnerId::new("ana");
        store.save(&owner, &snapshot(1, "corto"), "Uno", false).expect("fits");
        let used = store.used_bytes();

        let huge = "z".repeat(4_096);
        let err = store
            .save(&owner, &snapshot(2, &huge), "Dos", false)
            .expect_err("too big");
        assert!(matches!(err, RefugioError::StorageFull { .. }));
        assert_eq!(store.used_bytes(), used);
        assert_eq!(store.count_manual_saves(&owner).expect("count"), 1);
    }

    #[test]
    fn deleting_releases_bytes() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let owner = OwnerId::new("ana");
        let saved = store.save(&owner, &snapshot(1, "x"), "Uno", false).expect("save");
        assert!(store.used_bytes() > 0);
        store.delete(&owner, saved.id).expect("delete");
        // Only the (now empty) index remains.
        let index_len = KvSaveStore::index_key(&owner).len() + "[]".len();
        assert_eq!(store.used_bytes(), index_len);
    }

    #[test]
    fn storage_stats_are_rounded() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let stats = store.storage_stats();
        assert!((stats.total_kib - 5_120.0).abs() < f64::EPSILON);
        assert!(stats.used_kib.abs() < f64::EPSILON);
        assert!(stats.percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn endings_are_recorded_once() {
        let store = KvSaveStore::new(&SaveConfig::default());
        let owner = OwnerId::new("ana");
        assert!(store.unlock_ending(&owner, "cure-found").expect("unlock"));
        assert!(!store.unlock_ending(&owner, "cure-found").expect("again"));
        assert!(store.unlock_ending(&owner, "leader-group").expect("unlock"));
        assert_eq!(
            store.unlocked_ending_ids(&owner).expect("ids"),
            vec!["leader-group", "cure-found"]
        );
        assert!(store.unlocked_endings(&OwnerId::new("bob")).expect("bob").is_empty());
    }
}
