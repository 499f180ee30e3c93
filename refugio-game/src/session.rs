//! One player's playthrough.
//!
//! ```text
//! submit_turn(input)
//!   ├─ classify(input)
//!   ├─ narrator.continue_story ──▶ narrative + image prompt
//!   ├─ narrator.illustrate / extract_items   (failures logged, ignored)
//!   ├─ commit: statistics, inventory, messages
//!   ├─ endings::check_ending_conditions ──▶ unlock + ending scene
//!   └─ every N turns, unless ended ──▶ auto-save
//! ```
//!
//! Nothing is committed until the narrator has answered, so a failed turn
//! can simply be retried.

use chrono::Utc;
use refugio_core::classifier::{ActionCategories, ActionClassifier};
use refugio_core::config::RefugioConfig;
use refugio_core::endings::{self, GameEnding};
use refugio_core::inventory::Inventory;
use refugio_core::save::{
    EndingLedger, SaveMetadata, SaveStore, SavedGame, SessionSnapshot, UnlockedEnding,
};
use refugio_core::statistics::GameStatistics;
use refugio_core::types::{GameMessage, InventoryItem, ItemId, OwnerId, SaveId};
use refugio_core::RefugioError;
use refugio_llm::StoryResponse;
use tracing::{debug, info, warn};

use crate::error::{GameError, Result};
use crate::narrator::Narrator;

// ---------------------------------------------------------------------------
// Configuration & outcomes
// ---------------------------------------------------------------------------

/// Session tunables, usually taken from [`RefugioConfig`].
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Distinct inventory stacks.
    pub max_items: usize,
    /// Turns between auto-saves; `0` disables them.
    pub auto_save_interval_turns: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            auto_save_interval_turns: 5,
        }
    }
}

impl From<&RefugioConfig> for GameConfig {
    fn from(config: &RefugioConfig) -> Self {
        Self {
            max_items: config.inventory.max_items,
            auto_save_interval_turns: config.saves.auto_save_interval_turns,
        }
    }
}

/// Whether the playthrough is still going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Accepting turns.
    Playing,
    /// An ending was reached; only restart or restore continue from here.
    Ended(&'static GameEnding),
}

/// An ending reached this turn.
#[derive(Debug, Clone)]
pub struct EndingOutcome {
    /// Catalog entry.
    pub ending: &'static GameEnding,
    /// Epilogue message appended to the conversation.
    pub scene: GameMessage,
    /// First time this owner reached it.
    pub newly_unlocked: bool,
}

/// Everything a caller needs to render one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Categories the action was counted under.
    pub categories: ActionCategories,
    /// Narrator reply appended to the conversation.
    pub reply: GameMessage,
    /// Items that made it into the inventory.
    pub items_added: Vec<InventoryItem>,
    /// Items found but left behind because the inventory was full.
    pub items_dropped: Vec<InventoryItem>,
    /// Set when this turn ended the game.
    pub ending: Option<EndingOutcome>,
    /// Auto-save written after this turn.
    pub auto_save: Option<SaveId>,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// A playthrough: conversation, inventory, statistics and status, plus the
/// narrator and save store it talks to.
pub struct GameSession<N, S> {
    owner: OwnerId,
    narrator: N,
    store: S,
    classifier: ActionClassifier,
    config: GameConfig,
    messages: Vec<GameMessage>,
    inventory: Inventory,
    statistics: GameStatistics,
    status: GameStatus,
}

impl<N, S> std::fmt::Debug for GameSession<N, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("owner", &self.owner)
            .field("messages", &self.messages.len())
            .field("inventory", &self.inventory.len())
            .field("turns", &self.statistics.turns_played)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<N: Narrator, S: SaveStore + EndingLedger> GameSession<N, S> {
    /// A fresh session for `owner`. Call [`start`](Self::start) next.
    #[must_use]
    pub fn new(
        owner: OwnerId,
        narrator: N,
        store: S,
        classifier: ActionClassifier,
        config: GameConfig,
    ) -> Self {
        let inventory = Inventory::new(config.max_items);
        Self {
            owner,
            narrator,
            store,
            classifier,
            config,
            messages: Vec::new(),
            inventory,
            statistics: GameStatistics::new(Utc::now()),
            status: GameStatus::Playing,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Player who owns the session.
    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Conversation, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[GameMessage] {
        &self.messages
    }

    /// Current inventory.
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Current counters.
    #[must_use]
    pub fn statistics(&self) -> &GameStatistics {
        &self.statistics
    }

    /// Playing or ended.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The narrator.
    #[must_use]
    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    /// The save store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// State as it would be saved.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            inventory: self.inventory.items().to_vec(),
            statistics: self.statistics.clone(),
        }
    }

    fn ensure_playing(&self) -> Result<()> {
        match self.status {
            GameStatus::Playing => Ok(()),
            GameStatus::Ended(ending) => Err(GameError::GameOver(ending.id)),
        }
    }

    // ------------------------------------------------------------------
    // Turn loop
    // ------------------------------------------------------------------

    /// Narrate the opening scene and append it. Items it mentions are
    /// picked up.
    ///
    /// # Errors
    ///
    /// Narrator failures.
    pub async fn start(&mut self) -> Result<GameMessage> {
        let story = self.narrator.opening().await?;
        let (reply, added, _) = self.narrate_reply(story).await;
        info!(owner = %self.owner, items = added.len(), "Game started");
        self.messages.push(reply.clone());
        Ok(reply)
    }

    /// Play one turn.
    ///
    /// # Errors
    ///
    /// [`GameError::EmptyInput`] for blank input, [`GameError::GameOver`]
    /// after an ending, and narrator failures for the main story call. In
    /// every error case the session is left unchanged.
    pub async fn submit_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GameError::EmptyInput);
        }
        self.ensure_playing()?;

        let categories = self.classifier.classify(input);
        let story = self
            .narrator
            .continue_story(&self.messages, input, &self.inventory.summary())
            .await?;

        let (reply, items_added, items_dropped) = self.narrate_reply(story).await;

        self.statistics.record_turn(categories);
        self.statistics.refresh_survival_time(Utc::now());
        self.messages.push(GameMessage::user(input));
        self.messages.push(reply.clone());

        debug!(
            owner = %self.owner,
            turn = self.statistics.turns_played,
            combat = categories.combat,
            exploration = categories.exploration,
            social = categories.social,
            items = items_added.len(),
            "Turn played"
        );

        let ending = match endings::check_ending_conditions(
            &self.statistics,
            &self.inventory,
            &self.messages,
        ) {
            Some(ending) => Some(self.finish(ending).await),
            None => None,
        };

        let auto_save = self.maybe_auto_save();

        Ok(TurnOutcome {
            categories,
            reply,
            items_added,
            items_dropped,
            ending,
            auto_save,
        })
    }

    /// Build the assistant message for a narrated scene: illustration and
    /// item pickup included. Inventory changes are applied here.
    async fn narrate_reply(
        &mut self,
        story: StoryResponse,
    ) -> (GameMessage, Vec<InventoryItem>, Vec<InventoryItem>) {
        let mut reply = GameMessage::assistant(story.narrative);

        match self.narrator.illustrate(&story.image_prompt).await {
            Ok(Some(image)) => reply = reply.with_image(image),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Illustration failed, continuing without image"),
        }

        let found = match self
            .narrator
            .extract_items(&reply.content, &self.inventory.names())
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Item extraction failed, no items this turn");
                Vec::new()
            }
        };

        let mut added = Vec::new();
        let mut dropped = Vec::new();
        for item in found {
            match self.inventory.add(item.clone()) {
                Ok(_) => added.push(item),
                Err(RefugioError::InventoryFull { limit }) => {
                    debug!(item = %item.name, limit, "Inventory full, item left behind");
                    dropped.push(item);
                }
                Err(e) => warn!(error = %e, "Could not add item"),
            }
        }

        reply.items_found.clone_from(&added);
        (reply, added, dropped)
    }

    /// Record the ending, unlock it and narrate the epilogue.
    async fn finish(&mut self, ending: &'static GameEnding) -> EndingOutcome {
        self.status = GameStatus::Ended(ending);
        info!(
            owner = %self.owner,
            ending = ending.id,
            turns = self.statistics.turns_played,
            "Ending reached"
        );

        let newly_unlocked = match self.store.unlock_ending(&self.owner, ending.id) {
            Ok(first) => first,
            Err(e) => {
                warn!(error = %e, ending = ending.id, "Could not record unlocked ending");
                false
            }
        };

        let scene_message = match self.narrator.ending_scene(ending, &self.statistics).await {
            Ok(story) => {
                let mut scene = GameMessage::assistant(story.narrative);
                match self.narrator.illustrate(&story.image_prompt).await {
                    Ok(Some(image)) => scene = scene.with_image(image),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Ending illustration failed"),
                }
                scene
            }
            Err(e) => {
                warn!(error = %e, "Ending scene failed, using catalog description");
                GameMessage::assistant(format!("{}\n\n{}", ending.title, ending.description))
            }
        };

        self.messages.push(scene_message.clone());
        EndingOutcome {
            ending,
            scene: scene_message,
            newly_unlocked,
        }
    }

    /// Finished playthroughs are never auto-saved.
    fn maybe_auto_save(&self) -> Option<SaveId> {
        if matches!(self.status, GameStatus::Ended(_)) {
            return None;
        }
        let interval = self.config.auto_save_interval_turns;
        let turns = self.statistics.turns_played;
        if interval == 0 || turns == 0 || turns % interval != 0 {
            return None;
        }
        match self.store.save(&self.owner, &self.snapshot(), "", true) {
            Ok(saved) => {
                debug!(owner = %self.owner, save = %saved.id, turn = turns, "Auto-saved");
                Some(saved.id)
            }
            Err(e) => {
                warn!(error = %e, turn = turns, "Auto-save failed");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Use one unit of an item.
    ///
    /// # Errors
    ///
    /// [`GameError::GameOver`] after an ending; item-not-found and
    /// not-usable errors from the inventory.
    pub fn use_item(&mut self, id: ItemId) -> Result<InventoryItem> {
        self.ensure_playing()?;
        let used = self.inventory.use_item(id)?;
        self.statistics.record_item_used();
        debug!(item = %used.name, left = used.quantity.saturating_sub(1), "Item used");
        Ok(used)
    }

    // ------------------------------------------------------------------
    // Save / restore
    // ------------------------------------------------------------------

    /// Write a manual save.
    ///
    /// # Errors
    ///
    /// [`GameError::GameOver`] after an ending; store failures, including a
    /// blank name.
    pub fn save(&mut self, name: &str) -> Result<SavedGame> {
        self.ensure_playing()?;
        self.statistics.refresh_survival_time(Utc::now());
        let saved = self.store.save(&self.owner, &self.snapshot(), name, false)?;
        info!(owner = %self.owner, save = %saved.id, name = %saved.name, "Game saved");
        Ok(saved)
    }

    /// Replace the session state with one of the owner's saves.
    ///
    /// # Errors
    ///
    /// Not-found (see [`GameError::is_not_found`]) when the save is missing
    /// or belongs to someone else; the session is untouched then.
    pub fn restore(&mut self, save_id: SaveId) -> Result<SavedGame> {
        let saved = self.store.load(&self.owner, save_id)?;
        self.apply(saved.clone());
        info!(owner = %self.owner, save = %save_id, turn = saved.turn_number, "Game restored");
        Ok(saved)
    }

    /// Restore the newest auto-save, if there is one.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn resume_auto_save(&mut self) -> Result<Option<SavedGame>> {
        let Some(saved) = self.store.latest_auto_save(&self.owner)? else {
            return Ok(None);
        };
        self.apply(saved.clone());
        Ok(Some(saved))
    }

    fn apply(&mut self, saved: SavedGame) {
        let snapshot = saved.into_snapshot();
        self.messages = snapshot.messages;
        self.inventory = Inventory::from_items(snapshot.inventory, self.config.max_items);
        self.statistics = snapshot.statistics;
        self.status = GameStatus::Playing;
    }

    /// The owner's saves, newest first.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn list_saves(&self) -> Result<Vec<SaveMetadata>> {
        Ok(self.store.list(&self.owner)?)
    }

    /// Delete one of the owner's saves.
    ///
    /// # Errors
    ///
    /// Not-found for missing or foreign saves.
    pub fn delete_save(&self, save_id: SaveId) -> Result<()> {
        Ok(self.store.delete(&self.owner, save_id)?)
    }

    /// Endings the owner has reached, most recent first.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn unlocked_endings(&self) -> Result<Vec<UnlockedEnding>> {
        Ok(self.store.unlocked_endings(&self.owner)?)
    }

    /// Drop all state and start counting from zero. Call
    /// [`start`](Self::start) for a new opening scene.
    pub fn restart(&mut self) {
        info!(owner = %self.owner, "Game restarted");
        self.messages.clear();
        self.inventory = Inventory::new(self.config.max_items);
        self.statistics = GameStatistics::new(Utc::now());
        self.status = GameStatus::Playing;
    }
}
