//! Narration backend errors.

use thiserror::Error;

/// Why a story, ending or item-extraction call produced nothing usable.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The model answered, but not in the shape the caller asked for
    /// (bad JSON, no item list).
    #[error("Narrator output could not be parsed: {0}")]
    Malformed(String),

    /// The model answered with blank text.
    #[error("Model returned no narration")]
    EmptyResponse,

    /// One attempt ran past the per-request timeout.
    #[error("Model did not answer within {0}ms")]
    Timeout(u64),

    /// No backend is configured, so nothing can be narrated.
    #[error("No narration backend: {0}")]
    NoBackend(String),

    /// Every attempt failed; `last_error` describes the final one.
    #[error("Gave up on the model after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error of the final attempt.
        last_error: String,
    },

    /// The `[llm]` table names an unknown provider or lacks its API key.
    #[error("Invalid provider setting: {0}")]
    BadProvider(String),
}

impl LlmError {
    /// Whether a later turn could succeed without changing the config.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse | Self::Timeout(_) | Self::RetriesExhausted { .. }
        )
    }
}
