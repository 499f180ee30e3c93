//! Configuration for Refugio.
//!
//! Maps directly to `refugio.toml`. Every table is optional; missing keys
//! fall back to the defaults the game ships with.

use serde::{Deserialize, Serialize};

use crate::classifier::KeywordSets;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefugioConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Keyword sets used by the action classifier.
    #[serde(default)]
    pub classifier: KeywordSets,
    /// Inventory limits.
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Save/load settings.
    #[serde(default)]
    pub saves: SaveConfig,
    /// Narrative text handling.
    #[serde(default)]
    pub narrative: NarrativeConfig,
    /// LLM backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl RefugioConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `RefugioError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::RefugioError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Inventory limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Maximum number of distinct item stacks.
    #[serde(default = "default_10")]
    pub max_items: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { max_items: 10 }
    }
}

/// Save/load configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Manual saves kept per owner before the oldest is evicted.
    #[serde(default = "default_5_usize")]
    pub max_manual_saves: usize,
    /// Auto-saves kept per owner before the oldest is evicted.
    #[serde(default = "default_5_usize")]
    pub max_auto_saves: usize,
    /// Turns between auto-saves. `0` disables auto-saving.
    #[serde(default = "default_5_u32")]
    pub auto_save_interval_turns: u32,
    /// Use WAL mode for the SQLite store.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a CRC-32 of each snapshot.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Byte quota of the key-value store.
    #[serde(default = "default_quota")]
    pub kv_quota_bytes: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            max_manual_saves: 5,
            max_auto_saves: 5,
            auto_save_interval_turns: 5,
            wal_mode: true,
            checksum_enabled: true,
            kv_quota_bytes: default_quota(),
        }
    }
}

/// How raw narrator output is split and defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Token separating the narrative from the image prompt.
    #[serde(default = "default_separator")]
    pub image_separator: String,
    /// Image prompt used when the narrator omits one.
    #[serde(default = "default_image_prompt")]
    pub default_image_prompt: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            image_separator: default_separator(),
            default_image_prompt: default_image_prompt(),
        }
    }
}

/// LLM integration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for the story.
    #[serde(default = "default_story_model")]
    pub story_model: String,
    /// Model used for item extraction.
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Retries before giving up.
    #[serde(default = "default_2")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            story_model: default_story_model(),
            extraction_model: default_extraction_model(),
            request_timeout_ms: 30_000,
            max_retries: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_separator() -> String { "IMAGEN: ".to_string() }
fn default_image_prompt() -> String { "zombie apocalypse scene".to_string() }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_story_model() -> String { "mistral:7b-instruct".to_string() }
fn default_extraction_model() -> String { "qwen2.5:1.5b".to_string() }
fn default_2() -> u32 { 2 }
fn default_5_u32() -> u32 { 5 }
fn default_5_usize() -> usize { 5 }
fn default_10() -> usize { 10 }
fn default_30000() -> u64 { 30_000 }
fn default_quota() -> usize { 5 * 1024 * 1024 }
