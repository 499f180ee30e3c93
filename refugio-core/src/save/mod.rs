//! Save/load of play sessions.
//!
//! A save is a versioned snapshot of `{messages, inventory, statistics}`
//! owned by one player. Two backends implement [`SaveStore`]:
//!
//! - [`sqlite::SqliteSaveStore`] — relational, the snapshot is split over
//!   child tables that are written in one transaction. Manual saves and
//!   auto-saves are capped independently.
//! - [`kv::KvSaveStore`] — owner-scoped key-value store with a byte quota,
//!   capped manual saves and a single auto-save slot per owner.
//!
//! Both backends enforce ownership on every read and delete: asking for a
//! save that belongs to somebody else is indistinguishable from asking for
//! one that does not exist.
//!
//! Both also implement [`EndingLedger`], the per-player record of which
//! endings have been reached at least once.

pub mod kv;
pub mod sqlite;

pub use kv::KvSaveStore;
pub use sqlite::SqliteSaveStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::endings::{self, GameEnding};
use crate::error::{RefugioError, Result};
use crate::statistics::GameStatistics;
use crate::types::{GameMessage, InventoryItem, OwnerId, SaveId};

/// What a session hands to [`SaveStore::save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Full conversation, oldest first.
    pub messages: Vec<GameMessage>,
    /// Inventory stacks.
    pub inventory: Vec<InventoryItem>,
    /// Counters at the time of the save.
    pub statistics: GameStatistics,
}

/// A persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    /// Save identity.
    pub id: SaveId,
    /// Player who owns the save.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// When the save was written.
    pub timestamp: DateTime<Utc>,
    /// Full conversation, oldest first.
    pub messages: Vec<GameMessage>,
    /// Inventory stacks.
    pub inventory: Vec<InventoryItem>,
    /// Counters at the time of the save.
    pub statistics: GameStatistics,
    /// `statistics.turns_played` at save time.
    pub turn_number: u32,
    /// Base64 image of the last illustrated message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Written automatically rather than by the player.
    #[serde(default)]
    pub is_auto_save: bool,
    /// Format version of the backend that wrote it.
    pub version: String,
}

impl SavedGame {
    /// Build a new save from a snapshot. The id is fresh and the thumbnail is
    /// taken from the last illustrated message.
    #[must_use]
    pub fn from_snapshot(
        owner: &OwnerId,
        snapshot: &SessionSnapshot,
        name: String,
        is_auto_save: bool,
        version: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SaveId::new(),
            owner: owner.clone(),
            name,
            timestamp,
            messages: snapshot.messages.clone(),
            inventory: snapshot.inventory.clone(),
            statistics: snapshot.statistics.clone(),
            turn_number: snapshot.statistics.turns_played,
            thumbnail: extract_thumbnail(&snapshot.messages),
            is_auto_save,
            version: version.to_string(),
        }
    }

    /// Lightweight listing entry.
    #[must_use]
    pub fn metadata(&self) -> SaveMetadata {
        SaveMetadata {
            id: self.id,
            name: self.name.clone(),
            timestamp: self.timestamp,
            turn_number: self.turn_number,
            thumbnail: self.thumbnail.clone(),
            survival_time: self.statistics.survival_time,
            is_auto_save: self.is_auto_save,
        }
    }

    /// Drop the save envelope, keeping the session state.
    #[must_use]
    pub fn into_snapshot(self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages,
            inventory: self.inventory,
            statistics: self.statistics,
        }
    }
}

/// Listing entry without message bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// Save identity.
    pub id: SaveId,
    /// Display name.
    pub name: String,
    /// When the save was written.
    pub timestamp: DateTime<Utc>,
    /// Turn reached.
    pub turn_number: u32,
    /// Base64 thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Minutes survived.
    pub survival_time: u32,
    /// Written automatically.
    #[serde(default)]
    pub is_auto_save: bool,
}

/// Durable snapshot/restore of play sessions, scoped by owner.
pub trait SaveStore {
    /// Persist a snapshot, evicting the oldest save of the same kind when the
    /// owner is at the cap.
    ///
    /// # Errors
    ///
    /// [`RefugioError::InvalidSave`] for a manual save without a name, plus
    /// backend-specific failures.
    fn save(
        &self,
        owner: &OwnerId,
        snapshot: &SessionSnapshot,
        name: &str,
        is_auto_save: bool,
    ) -> Result<SavedGame>;

    /// Load a save owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`RefugioError::SaveNotFound`] if the save is absent or owned by
    /// someone else.
    fn load(&self, owner: &OwnerId, save_id: SaveId) -> Result<SavedGame>;

    /// All of `owner`'s saves, newest first, without message bodies.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn list(&self, owner: &OwnerId) -> Result<Vec<SaveMetadata>>;

    /// Delete a save owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`RefugioError::SaveNotFound`] if the save is absent or owned by
    /// someone else.
    fn delete(&self, owner: &OwnerId, save_id: SaveId) -> Result<()>;

    /// The most recent auto-save, if any.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn latest_auto_save(&self, owner: &OwnerId) -> Result<Option<SavedGame>>;

    /// Number of manual saves `owner` currently has.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn count_manual_saves(&self, owner: &OwnerId) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// Unlocked endings
// ---------------------------------------------------------------------------

/// An ending a player has reached at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedEnding {
    /// Catalog id.
    pub ending_id: String,
    /// First time it was reached.
    pub achieved_at: DateTime<Utc>,
}

impl UnlockedEnding {
    /// Catalog entry for this record.
    #[must_use]
    pub fn ending(&self) -> Option<&'static GameEnding> {
        endings::ending_by_id(&self.ending_id)
    }
}

/// Per-owner record of reached endings.
pub trait EndingLedger {
    /// Mark an ending as reached. Returns `true` the first time, `false` if it
    /// was already unlocked.
    ///
    /// # Errors
    ///
    /// [`RefugioError::UnknownEnding`] for ids outside the catalog.
    fn unlock_ending(&self, owner: &OwnerId, ending_id: &str) -> Result<bool>;

    /// Unlocked endings, most recent first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn unlocked_endings(&self, owner: &OwnerId) -> Result<Vec<UnlockedEnding>>;

    /// Whether `owner` has reached `ending_id`.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn has_unlocked_ending(&self, owner: &OwnerId, ending_id: &str) -> Result<bool> {
        Ok(self
            .unlocked_endings(owner)?
            .iter()
            .any(|u| u.ending_id == ending_id))
    }

    /// Ids of every unlocked ending.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn unlocked_ending_ids(&self, owner: &OwnerId) -> Result<Vec<String>> {
        Ok(self
            .unlocked_endings(owner)?
            .into_iter()
            .map(|u| u.ending_id)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Base64 data of the last message that carries an image.
#[must_use]
pub fn extract_thumbnail(messages: &[GameMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find_map(|m| m.image.as_ref().filter(|img| !img.base64_data.is_empty()))
        .map(|img| img.base64_data.clone())
}

/// Manual saves must be named; auto-saves get a timestamped default.
pub(crate) fn resolve_save_name(
    name: &str,
    is_auto_save: bool,
    now: DateTime<Utc>,
) -> Result<String> {
    let trimmed = name.trim();
    if !trimmed.is_empty() {
        return Ok(trimmed.to_string());
    }
    if is_auto_save {
        return Ok(format!("Auto-guardado {}", now.format("%Y-%m-%d %H:%M")));
    }
    Err(RefugioError::InvalidSave(
        "manual saves need a name".to_string(),
    ))
}

pub(crate) fn ensure_known_ending(ending_id: &str) -> Result<()> {
    if endings::ending_by_id(ending_id).is_some() {
        Ok(())
    } else {
        Err(RefugioError::UnknownEnding(ending_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeneratedImage;

    #[test]
    fn thumbnail_comes_from_last_illustrated_message() {
        let messages = vec![
            GameMessage::assistant("Inicio").with_image(GeneratedImage::png("first")),
            GameMessage::user("Corro"),
            GameMessage::assistant("Pasillo").with_image(GeneratedImage::png("second")),
            GameMessage::user("Abro la puerta"),
        ];
        assert_eq!(extract_thumbnail(&messages).as_deref(), Some("second"));
        assert_eq!(extract_thumbnail(&messages[1..2]), None);
    }

    #[test]
    fn manual_saves_need_a_name() {
        let now = Utc::now();
        assert!(matches!(
            resolve_save_name("   ", false, now),
            Err(RefugioError::InvalidSave(_))
        ));
        assert_eq!(resolve_save_name(" Hospital ", false, now).expect("name"), "Hospital");
        assert!(
            resolve_save_name("", true, now)
                .expect("auto name")
                .starts_with("Auto-guardado ")
        );
    }

    #[test]
    fn unknown_endings_are_rejected() {
        assert!(ensure_known_ending("escape-safe").is_ok());
        assert!(matches!(
            ensure_known_ending("happily-ever-after"),
            Err(RefugioError::UnknownEnding(_))
        ));
    }
}
