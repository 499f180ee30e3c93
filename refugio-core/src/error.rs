//! Error types for the Refugio core library.

use thiserror::Error;

use crate::types::{ItemId, OwnerId, SaveId};

/// Top-level error type for all Refugio core operations.
#[derive(Error, Debug)]
pub enum RefugioError {
    /// The save does not exist, or exists but belongs to another owner.
    #[error("Save not found: {save} (owner: {owner})")]
    SaveNotFound {
        /// Owner that asked for the save.
        owner: OwnerId,
        /// Requested save.
        save: SaveId,
    },

    /// The save payload was rejected before it reached storage.
    #[error("Invalid save: {0}")]
    InvalidSave(String),

    /// The local key-value store has no room left for the snapshot.
    #[error("Storage full: needed {needed} bytes, {available} bytes available")]
    StorageFull {
        /// Bytes the new value would occupy.
        needed: usize,
        /// Bytes left under the quota.
        available: usize,
    },

    /// Inventory already holds the maximum number of distinct items.
    #[error("Inventory full ({limit} distinct items)")]
    InventoryFull {
        /// Configured cap.
        limit: usize,
    },

    /// No inventory entry with this id.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item exists but cannot be used directly.
    #[error("Item cannot be used: {0}")]
    ItemNotUsable(String),

    /// Ending id is not part of the catalog.
    #[error("Unknown ending: {0}")]
    UnknownEnding(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefugioError {
    /// Whether this error means "no such save for this owner".
    ///
    /// Callers render this as a user-facing message rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SaveNotFound { .. })
    }
}

impl From<serde_json::Error> for RefugioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RefugioError>;
