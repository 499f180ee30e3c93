//! # refugio-llm — Narrative generation for Refugio
//!
//! Talks to a text-generation backend and turns its raw output into the
//! pieces the game needs:
//!   - **Ollama** (local, default)
//!   - **OpenAI-compatible API**
//!   - **None** (every call fails; the caller decides how to degrade)
//!
//! # Architecture
//!
//! ```text
//! prompt::render_template ──▶ LlmClient::generate ──▶ raw text
//!                                                        │
//!              narrative::split_narrative ◀──────────────┤  story / ending
//!              narrative::parse_extracted_items ◀────────┘  item extraction
//! ```
//!
//! Two models are configured: a larger one for the story and a small one for
//! item extraction, which runs in JSON mode.

pub mod client;
pub mod error;
pub mod narrative;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use narrative::{parse_extracted_items, split_narrative};
pub use types::{ExtractedItem, LlmRequest, LlmResponse, LlmTask, StoryResponse};
