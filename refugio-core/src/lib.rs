//! # Refugio Core Library
//!
//! Game logic for a chat-driven zombie-survival story. The narrative itself is
//! produced elsewhere (see `refugio-llm`); this crate owns everything that has
//! to be deterministic:
//!
//! - **Classifier** — maps free-text player actions to combat / exploration /
//!   social categories
//! - **Endings** — the fixed catalog of seven endings and the priority rules
//!   that decide when one has been reached
//! - **Inventory** and **Statistics** — the per-session state the rules read
//! - **Save** — versioned snapshots of a session, stored in SQLite or in an
//!   owner-scoped key-value store, with per-kind save caps
//!
//! ## Turn flow
//!
//! ```text
//! player text ──▶ classify ──▶ statistics.record_turn
//!                                   │
//!              narrative ◀──────────┘
//!                  │
//!                  ▼
//!   endings::check_ending_conditions ──▶ Some(ending) → game over
//!                  │
//!                  └─ every N turns ──▶ SaveStore::save (auto)
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod endings;
pub mod error;
pub mod inventory;
pub mod save;
pub mod statistics;
pub mod types;

pub use classifier::{ActionCategories, ActionClassifier};
pub use config::RefugioConfig;
pub use endings::{EndingType, GameEnding};
pub use error::RefugioError;
pub use inventory::Inventory;
pub use save::{EndingLedger, SaveStore, SavedGame, SessionSnapshot};
pub use statistics::GameStatistics;
pub use types::*;
