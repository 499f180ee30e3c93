//! Error types for the game session.

use thiserror::Error;

use refugio_core::RefugioError;
use refugio_llm::LlmError;

/// Errors surfaced by [`crate::GameSession`].
#[derive(Error, Debug)]
pub enum GameError {
    /// Core rule or storage failure.
    #[error(transparent)]
    Core(#[from] RefugioError),

    /// Narration backend failure.
    #[error("Narrator error: {0}")]
    Narrator(#[from] LlmError),

    /// The player submitted only whitespace.
    #[error("Empty player input")]
    EmptyInput,

    /// The playthrough already reached an ending.
    #[error("Game over: ending '{0}' already reached")]
    GameOver(&'static str),

    /// Logging could not be initialised.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl GameError {
    /// Whether this is a missing or foreign save.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_not_found())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GameError>;
