//! # refugio-game — Turn loop for Refugio
//!
//! Glues the deterministic rules in `refugio-core` to the narration in
//! `refugio-llm`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              GameSession                 │
//! │  ┌──────────────┐    ┌────────────────┐  │
//! │  │   Narrator   │    │ SaveStore +    │  │
//! │  │ (LlmNarrator)│    │ EndingLedger   │  │
//! │  └──────┬───────┘    └───────┬────────┘  │
//! │         ▼                    ▼           │
//! │    refugio-llm          refugio-core     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `session` — [`GameSession`], the per-player state machine
//! - `narrator` — the [`Narrator`] seam and its LLM-backed implementation
//! - `telemetry` — `tracing` subscriber setup
//! - `error` — [`GameError`]

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod narrator;
pub mod session;
pub mod telemetry;

pub use error::GameError;
pub use narrator::{LlmNarrator, Narrator};
pub use session::{EndingOutcome, GameConfig, GameSession, GameStatus, TurnOutcome};

use refugio_core::RefugioConfig;
use refugio_llm::{LlmClient, LlmProvider};

/// Build an [`LlmNarrator`] from the `[llm]` and `[narrative]` config tables.
///
/// # Errors
///
/// [`GameError::Narrator`] for an unknown provider or a missing API key.
pub fn narrator_from_config(config: &RefugioConfig) -> error::Result<LlmNarrator> {
    let llm = &config.llm;
    let provider = LlmProvider::from_name(&llm.provider, llm.base_url.clone(), llm.api_key.clone())?;
    let client = LlmClient::new(
        provider,
        llm.story_model.clone(),
        llm.extraction_model.clone(),
        llm.max_retries,
    );
    Ok(LlmNarrator::new(
        client,
        config.narrative.clone(),
        llm.request_timeout_ms,
    ))
}
