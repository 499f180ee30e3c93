//! Narration seam.
//!
//! [`GameSession`](crate::GameSession) talks to the story backend only
//! through [`Narrator`], so tests can script the story and alternative
//! backends can be dropped in.

use refugio_core::config::NarrativeConfig;
use refugio_core::endings::GameEnding;
use refugio_core::statistics::GameStatistics;
use refugio_core::types::{GameMessage, GeneratedImage, InventoryItem, ItemType};
use refugio_llm::narrative::{ending_image_prompt, parse_extracted_items, split_narrative};
use refugio_llm::{prompt, ExtractedItem, LlmClient, LlmRequest, StoryResponse};
use tracing::debug;

use crate::error::Result;

/// Produces story text for a session.
#[allow(async_fn_in_trait)]
pub trait Narrator {
    /// Opening scene of a new playthrough.
    async fn opening(&self) -> Result<StoryResponse>;

    /// Next scene after `input`. `history` excludes the new input.
    async fn continue_story(
        &self,
        history: &[GameMessage],
        input: &str,
        inventory_summary: &str,
    ) -> Result<StoryResponse>;

    /// Pick-up-able items mentioned in `narrative`, skipping `owned` names.
    async fn extract_items(&self, narrative: &str, owned: &[String]) -> Result<Vec<InventoryItem>>;

    /// Epilogue for a reached ending.
    async fn ending_scene(
        &self,
        ending: &GameEnding,
        stats: &GameStatistics,
    ) -> Result<StoryResponse>;

    /// Render an illustration. Narrators without an image backend return
    /// `Ok(None)`.
    async fn illustrate(&self, _image_prompt: &str) -> Result<Option<GeneratedImage>> {
        Ok(None)
    }
}

/// Turn an extractor answer into an inventory item with a fresh id.
///
/// Unknown types become [`ItemType::Misc`]; a missing icon becomes 📦.
#[must_use]
pub fn to_inventory_item(extracted: ExtractedItem) -> InventoryItem {
    let item_type = extracted.item_type.parse().unwrap_or(ItemType::Misc);
    let icon = if extracted.icon.trim().is_empty() {
        "📦".to_string()
    } else {
        extracted.icon
    };
    InventoryItem::new(
        extracted.name.trim(),
        extracted.description,
        item_type,
        extracted.usable,
        icon,
    )
}

/// [`Narrator`] backed by an [`LlmClient`].
#[derive(Debug)]
pub struct LlmNarrator {
    client: LlmClient,
    narrative: NarrativeConfig,
    timeout_ms: u64,
}

impl LlmNarrator {
    /// Wrap a client. `timeout_ms` applies to every request.
    #[must_use]
    pub fn new(client: LlmClient, narrative: NarrativeConfig, timeout_ms: u64) -> Self {
        Self {
            client,
            narrative,
            timeout_ms,
        }
    }

    async fn story(&self, prompt: String, default_image: &str) -> Result<StoryResponse> {
        let request = LlmRequest::story(prompt).with_timeout(self.timeout_ms);
        let response = self.client.generate(&request).await?;
        debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            tokens = response.tokens_generated,
            "Narration generated"
        );
        Ok(split_narrative(
            &response.text,
            &self.narrative.image_separator,
            default_image,
        ))
    }
}

impl Narrator for LlmNarrator {
    async fn opening(&self) -> Result<StoryResponse> {
        self.story(prompt::initial_story(), &self.narrative.default_image_prompt)
            .await
    }

    async fn continue_story(
        &self,
        history: &[GameMessage],
        input: &str,
        inventory_summary: &str,
    ) -> Result<StoryResponse> {
        let history = prompt::format_history(
            history
                .iter()
                .map(|m| (m.role.as_str(), m.content.as_str())),
        );
        self.story(
            prompt::continue_story(&history, input, inventory_summary),
            &self.narrative.default_image_prompt,
        )
        .await
    }

    async fn extract_items(&self, narrative: &str, owned: &[String]) -> Result<Vec<InventoryItem>> {
        let request = LlmRequest::extraction(prompt::item_extraction(narrative, owned))
            .with_timeout(self.timeout_ms);
        let response = self.client.generate(&request).await?;
        let items = parse_extracted_items(&response.text)?;
        Ok(items
            .into_iter()
            .filter(|i| !owned.contains(&i.name.trim().to_lowercase()))
            .map(to_inventory_item)
            .collect())
    }

    async fn ending_scene(
        &self,
        ending: &GameEnding,
        stats: &GameStatistics,
    ) -> Result<StoryResponse> {
        let ending_type = ending.ending_type.as_str();
        self.story(
            prompt::ending_scene(ending_type, ending.title, &stats.summary()),
            &ending_image_prompt(ending_type),
        )
        .await
    }
}
