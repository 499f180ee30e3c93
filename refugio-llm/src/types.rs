//! Core types for LLM requests and responses.

use serde::{Deserialize, Serialize};

/// Which configured model serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmTask {
    /// Story and ending narration (larger model).
    Story,
    /// Item extraction (small model, JSON output).
    Extraction,
}

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// Optional system prompt.
    pub system: Option<String>,
    /// The prompt proper.
    pub prompt: String,
    /// Which model to use.
    pub task: LlmTask,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Ask the backend for a JSON object.
    pub json_mode: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A narration request.
    #[must_use]
    pub fn story(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            task: LlmTask::Story,
            max_tokens: 600,
            temperature: 0.8,
            json_mode: false,
            timeout_ms: 30_000,
        }
    }

    /// An item-extraction request. Always JSON mode, low temperature.
    #[must_use]
    pub fn extraction(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            task: LlmTask::Extraction,
            max_tokens: 300,
            temperature: 0.1,
            json_mode: true,
            timeout_ms: 15_000,
        }
    }

    /// Set a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

/// Narrative text with the image prompt split off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryResponse {
    /// Text shown to the player.
    pub narrative: String,
    /// English description for the illustration.
    pub image_prompt: String,
}

/// An item the extractor found in a narrative, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// One of weapon, food, medical, tool, key, misc.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Emoji.
    #[serde(default)]
    pub icon: String,
    /// Whether the player can use it directly.
    #[serde(default)]
    pub usable: bool,
}

/// Wire shape of the extraction answer: `{"items": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ExtractionEnvelope {
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
}
