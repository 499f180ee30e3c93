//! SQLite save store.
//!
//! One row in `saved_games` per save; the snapshot is spread over child
//! tables that cascade on delete:
//!
//! ```sql
//! saved_games     (seq PK, id UNIQUE, owner_id, name, turn_number, survival_time,
//!                  thumbnail, is_auto_save, version, created_at, checksum)
//! save_messages   (save_id → saved_games.id, position, id, role, content,
//!                  image_data, image_media_type, items)
//! save_inventory  (save_id → saved_games.id, items)
//! save_statistics (save_id → saved_games.id, counters…, start_time, survival_time)
//! unlocked_endings(owner_id, ending_id, achieved_at)
//! ```
//!
//! - `seq` is the insertion order; eviction removes the lowest `seq` of the
//!   same kind (manual or auto) for the owner.
//! - Eviction and insert share one transaction, so a save is either fully
//!   written with all its children or not at all.
//! - Optional CRC-32 over the snapshot JSON detects save corruption.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use crc::{Crc, CRC_32_ISO_HDLC};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use super::{
    ensure_known_ending, resolve_save_name, EndingLedger, SaveMetadata, SaveStore, SavedGame,
    SessionSnapshot, UnlockedEnding,
};
use crate::config::SaveConfig;
use crate::error::{RefugioError, Result};
use crate::statistics::GameStatistics;
use crate::types::{GameMessage, GeneratedImage, InventoryItem, MessageId, OwnerId, Role, SaveId};

/// Format version written by this backend.
pub const DB_SAVE_VERSION: &str = "2.0";

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS saved_games (
        seq           INTEGER PRIMARY KEY AUTOINCREMENT,
        id            TEXT NOT NULL UNIQUE,
        owner_id      TEXT NOT NULL,
        name          TEXT NOT NULL,
        turn_number   INTEGER NOT NULL,
        survival_time INTEGER NOT NULL,
        thumbnail     TEXT,
        is_auto_save  INTEGER NOT NULL,
        version       TEXT NOT NULL,
        created_at    TEXT NOT NULL,
        checksum      TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_saved_games_owner
        ON saved_games (owner_id, is_auto_save, seq);
    CREATE TABLE IF NOT EXISTS save_messages (
        save_id          TEXT NOT NULL REFERENCES saved_games(id) ON DELETE CASCADE,
        position         INTEGER NOT NULL,
        id               TEXT NOT NULL,
        role             TEXT NOT NULL,
        content          TEXT NOT NULL,
        image_data       TEXT,
        image_media_type TEXT,
        items            TEXT,
        PRIMARY KEY (save_id, position)
    );
    CREATE TABLE IF NOT EXISTS save_inventory (
        save_id TEXT PRIMARY KEY REFERENCES saved_games(id) ON DELETE CASCADE,
        items   TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS save_statistics (
        save_id             TEXT PRIMARY KEY REFERENCES saved_games(id) ON DELETE CASCADE,
        decisions_count     INTEGER NOT NULL,
        combat_actions      INTEGER NOT NULL,
        exploration_actions INTEGER NOT NULL,
        social_actions      INTEGER NOT NULL,
        items_used          INTEGER NOT NULL,
        turns_played        INTEGER NOT NULL,
        start_time          TEXT NOT NULL,
        survival_time       INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS unlocked_endings (
        owner_id    TEXT NOT NULL,
        ending_id   TEXT NOT NULL,
        achieved_at TEXT NOT NULL,
        PRIMARY KEY (owner_id, ending_id)
    );";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// CRC-32 (ISO-HDLC) of the snapshot JSON as lowercase hex.
fn snapshot_checksum(snapshot: &SessionSnapshot) -> Result<String> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(format!("{:08x}", CRC32.checksum(&json)))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RefugioError::Serialization(format!("bad timestamp '{raw}': {e}")))
}

fn parse_field<T>(raw: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| RefugioError::Serialization(format!("bad {what} '{raw}': {e}")))
}

fn limit_as_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

struct HeaderRow {
    id: String,
    name: String,
    turn_number: u32,
    thumbnail: Option<String>,
    is_auto_save: bool,
    version: String,
    created_at: String,
    checksum: Option<String>,
}

struct MessageRow {
    id: String,
    role: String,
    content: String,
    image_data: Option<String>,
    image_media_type: Option<String>,
    items: Option<String>,
}

// ---------------------------------------------------------------------------
// SqliteSaveStore
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database holding saved games.
///
/// # Usage
///
/// ```no_run
/// # use refugio_core::save::{SaveStore, SessionSnapshot, SqliteSaveStore};
/// # use refugio_core::config::SaveConfig;
/// # use refugio_core::statistics::GameStatistics;
/// # use refugio_core::types::OwnerId;
/// let store = SqliteSaveStore::open("refugio.db", &SaveConfig::default())?;
/// let owner = OwnerId::new("ana@example.com");
/// let snapshot = SessionSnapshot {
///     messages: vec![],
///     inventory: vec![],
///     statistics: GameStatistics::default(),
/// };
/// let saved = store.save(&owner, &snapshot, "Antes del hospital", false)?;
/// let loaded = store.load(&owner, saved.id)?;
/// # Ok::<(), refugio_core::error::RefugioError>(())
/// ```
pub struct SqliteSaveStore {
    conn: Connection,
    config: SaveConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteSaveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSaveStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteSaveStore {
    /// Open (or create) a database at `path`.
    ///
    /// The schema is created if missing. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`RefugioError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &SaveConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Self::init(&conn)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Save store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`RefugioError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &SaveConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        // Child rows rely on ON DELETE CASCADE.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Delete the oldest saves of one kind until there is room for one more.
    fn evict_for_insert(
        tx: &Transaction<'_>,
        owner: &OwnerId,
        is_auto_save: bool,
        limit: usize,
    ) -> Result<usize> {
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM saved_games WHERE owner_id = ?1 AND is_auto_save = ?2",
            params![owner.as_str(), is_auto_save],
            |row| row.get(0),
        )?;

        let excess = count + 1 - limit_as_i64(limit.max(1));
        if excess <= 0 {
            return Ok(0);
        }

        let evicted = tx.execute(
            "DELETE FROM saved_games WHERE id IN (
                SELECT id FROM saved_games
                WHERE owner_id = ?1 AND is_auto_save = ?2
                ORDER BY seq ASC
                LIMIT ?3
             )",
            params![owner.as_str(), is_auto_save, excess],
        )?;
        Ok(evicted)
    }

    fn insert(tx: &Transaction<'_>, saved: &SavedGame, checksum: Option<&str>) -> Result<()> {
        let save_id = saved.id.to_string();

        tx.execute(
            "INSERT INTO saved_games
                (id, owner_id, name, turn_number, survival_time, thumbnail,
                 is_auto_save, version, created_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                save_id,
                saved.owner.as_str(),
                saved.name,
                saved.turn_number,
                saved.statistics.survival_time,
                saved.thumbnail,
                saved.is_auto_save,
                saved.version,
                saved.timestamp.to_rfc3339(),
                checksum,
            ],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO save_messages
                    (save_id, position, id, role, content, image_data, image_media_type, items)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (position, msg) in saved.messages.iter().enumerate() {
                let items = if msg.items_found.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&msg.items_found)?)
                };
                stmt.execute(params![
                    save_id,
                    limit_as_i64(position),
                    msg.id.to_string(),
                    msg.role.as_str(),
                    msg.content,
                    msg.image.as_ref().map(|i| i.base64_data.as_str()),
                    msg.image.as_ref().map(|i| i.media_type.as_str()),
                    items,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO save_inventory (save_id, items) VALUES (?1, ?2)",
            params![save_id, serde_json::to_string(&saved.inventory)?],
        )?;

        let stats = &saved.statistics;
        tx.execute(
            "INSERT INTO save_statistics
                (save_id, decisions_count, combat_actions, exploration_actions, social_actions,
                 items_used, turns_played, start_time, survival_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                save_id,
                stats.decisions_count,
                stats.combat_actions,
                stats.exploration_actions,
                stats.social_actions,
                stats.items_used,
                stats.turns_played,
                stats.start_time.to_rfc3339(),
                stats.survival_time,
            ],
        )?;

        Ok(())
    }

    fn load_messages(&self, save_id: &str) -> Result<Vec<GameMessage>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, role, content, image_data, image_media_type, items
             FROM save_messages WHERE save_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![save_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                role: row.get(1)?,
                content: row.get(2)?,
                image_data: row.get(3)?,
                image_media_type: row.get(4)?,
                items: row.get(5)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let row = row?;
            let image = row.image_data.map(|data| GeneratedImage {
                base64_data: data,
                media_type: row
                    .image_media_type
                    .unwrap_or_else(|| "image/png".to_string()),
            });
            let items_found: Vec<InventoryItem> = match row.items {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };
            messages.push(GameMessage {
                id: parse_field::<MessageId>(&row.id, "message id")?,
                role: parse_field::<Role>(&row.role, "role")?,
                content: row.content,
                image,
                items_found,
            });
        }
        Ok(messages)
    }

    fn load_statistics(&self, save_id: &str) -> Result<GameStatistics> {
        let (stats, start_time) = self.conn.query_row(
            "SELECT decisions_count, combat_actions, exploration_actions, social_actions,
                    items_used, turns_played, start_time, survival_time
             FROM save_statistics WHERE save_id = ?1",
            params![save_id],
            |row| {
                let start_time: String = row.get(6)?;
                Ok((
                    GameStatistics {
                        decisions_count: row.get(0)?,
                        combat_actions: row.get(1)?,
                        exploration_actions: row.get(2)?,
                        social_actions: row.get(3)?,
                        items_used: row.get(4)?,
                        turns_played: row.get(5)?,
                        start_time: DateTime::<Utc>::MIN_UTC,
                        survival_time: row.get(7)?,
                    },
                    start_time,
                ))
            },
        )?;
        Ok(GameStatistics {
            start_time: parse_time(&start_time)?,
            ..stats
        })
    }

    // ------------------------------------------------------------------
    // Backup & maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`RefugioError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Save database backup completed"
        );
        Ok(())
    }

    /// Run `PRAGMA integrity_check`. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`RefugioError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl SaveStore for SqliteSaveStore {
    fn save(
        &self,
        owner: &OwnerId,
        snapshot: &SessionSnapshot,
        name: &str,
        is_auto_save: bool,
    ) -> Result<SavedGame> {
        let start = Instant::now();
        let now = Utc::now();
        let name = resolve_save_name(name, is_auto_save, now)?;
        let saved =
            SavedGame::from_snapshot(owner, snapshot, name, is_auto_save, DB_SAVE_VERSION, now);

        let checksum = if self.config.checksum_enabled {
            Some(snapshot_checksum(snapshot)?)
        } else {
            None
        };

        let limit = if is_auto_save {
            self.config.max_auto_saves
        } else {
            self.config.max_manual_saves
        };

        let tx = self.conn.unchecked_transaction()?;
        let evicted = Self::evict_for_insert(&tx, owner, is_auto_save, limit)?;
        Self::insert(&tx, &saved, checksum.as_deref())?;
        tx.commit()?;

        debug!(
            owner = %owner,
            save = %saved.id,
            auto = is_auto_save,
            messages = saved.messages.len(),
            evicted,
            elapsed_us = start.elapsed().as_micros(),
            "Saved game"
        );

        Ok(saved)
    }

    fn load(&self, owner: &OwnerId, save_id: SaveId) -> Result<SavedGame> {
        let start = Instant::now();
        let id_str = save_id.to_string();

        let header = self
            .conn
            .prepare_cached(
                "SELECT id, name, turn_number, thumbnail, is_auto_save, version, created_at, checksum
                 FROM saved_games WHERE id = ?1 AND owner_id = ?2",
            )?
            .query_row(params![id_str, owner.as_str()], |row| {
                Ok(HeaderRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    turn_number: row.get(2)?,
                    thumbnail: row.get(3)?,
                    is_auto_save: row.get(4)?,
                    version: row.get(5)?,
                    created_at: row.get(6)?,
                    checksum: row.get(7)?,
                })
            })
            .optional()?;

        let Some(header) = header else {
            return Err(RefugioError::SaveNotFound {
                owner: owner.clone(),
                save: save_id,
            });
        };

        let inventory_json: String = self.conn.query_row(
            "SELECT items FROM save_inventory WHERE save_id = ?1",
            params![header.id],
            |row| row.get(0),
        )?;

        let snapshot = SessionSnapshot {
            messages: self.load_messages(&header.id)?,
            inventory: serde_json::from_str(&inventory_json)?,
            statistics: self.load_statistics(&header.id)?,
        };

        if self.config.checksum_enabled {
            if let Some(ref expected) = header.checksum {
                let actual = snapshot_checksum(&snapshot)?;
                if *expected != actual {
                    warn!(
                        save = %save_id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, save may be corrupt"
                    );
                }
            }
        }

        let saved = SavedGame {
            id: save_id,
            owner: owner.clone(),
            name: header.name,
            timestamp: parse_time(&header.created_at)?,
            messages: snapshot.messages,
            inventory: snapshot.inventory,
            statistics: snapshot.statistics,
            turn_number: header.turn_number,
            thumbnail: header.thumbnail,
            is_auto_save: header.is_auto_save,
            version: header.version,
        };

        debug!(
            owner = %owner,
            save = %save_id,
            messages = saved.messages.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded game"
        );

        Ok(saved)
    }

    fn list(&self, owner: &OwnerId) -> Result<Vec<SaveMetadata>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, created_at, turn_number, thumbnail, survival_time, is_auto_save
             FROM saved_games WHERE owner_id = ?1 ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })?;

        let mut saves = Vec::new();
        for row in rows {
            let (id, name, created_at, turn_number, thumbnail, survival_time, is_auto_save) = row?;
            saves.push(SaveMetadata {
                id: parse_field(&id, "save id")?,
                name,
                timestamp: parse_time(&created_at)?,
                turn_number,
                thumbnail,
                survival_time,
                is_auto_save,
            });
        }
        Ok(saves)
    }

    fn delete(&self, owner: &OwnerId, save_id: SaveId) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM saved_games WHERE id = ?1 AND owner_id = ?2",
            params![save_id.to_string(), owner.as_str()],
        )?;
        if deleted == 0 {
            return Err(RefugioError::SaveNotFound {
                owner: owner.clone(),
                save: save_id,
            });
        }
        debug!(owner = %owner, save = %save_id, "Deleted save");
        Ok(())
    }

    fn latest_auto_save(&self, owner: &OwnerId) -> Result<Option<SavedGame>> {
        let latest: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM saved_games
                 WHERE owner_id = ?1 AND is_auto_save = 1
                 ORDER BY seq DESC LIMIT 1",
                params![owner.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match latest {
            Some(id) => self.load(owner, parse_field(&id, "save id")?).map(Some),
            None => Ok(None),
        }
    }

    fn count_manual_saves(&self, owner: &OwnerId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM saved_games WHERE owner_id = ?1 AND is_auto_save = 0",
            params![owner.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl EndingLedger for SqliteSaveStore {
    fn unlock_ending(&self, owner: &OwnerId, ending_id: &str) -> Result<bool> {
        ensure_known_ending(ending_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO unlocked_endings (owner_id, ending_id, achieved_at)
             VALUES (?1, ?2, ?3)",
            params![owner.as_str(), ending_id, Utc::now().to_rfc3339()],
        )?;
        if inserted > 0 {
            info!(owner = %owner, ending = ending_id, "Ending unlocked");
        }
        Ok(inserted > 0)
    }

    fn unlocked_endings(&self, owner: &OwnerId) -> Result<Vec<UnlockedEnding>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT ending_id, achieved_at FROM unlocked_endings
             WHERE owner_id = ?1 ORDER BY achieved_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut unlocked = Vec::new();
        for row in rows {
            let (ending_id, achieved_at) = row?;
            unlocked.push(UnlockedEnding {
                ending_id,
                achieved_at: parse_time(&achieved_at)?,
            });
        }
        Ok(unlocked)
    }

    fn has_unlocked_ending(&self, owner: &OwnerId, ending_id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM unlocked_endings WHERE owner_id = ?1 AND ending_id = ?2",
                params![owner.as_str(), ending_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
