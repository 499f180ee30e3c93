//! Per-session play statistics.
//!
//! Counters only ever grow during a playthrough; the only way back to zero
//! is a fresh [`GameStatistics::new`] on restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ActionCategories;

/// Accumulated counters for one playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Player decisions taken (one per turn).
    pub decisions_count: u32,
    /// Turns classified as combat.
    pub combat_actions: u32,
    /// Turns classified as exploration.
    pub exploration_actions: u32,
    /// Turns classified as social.
    pub social_actions: u32,
    /// Items consumed from the inventory.
    pub items_used: u32,
    /// Completed turns.
    pub turns_played: u32,
    /// When the playthrough began.
    pub start_time: DateTime<Utc>,
    /// Whole minutes survived, refreshed on save and on ending.
    pub survival_time: u32,
}

impl GameStatistics {
    /// Fresh statistics for a playthrough starting at `start_time`.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            decisions_count: 0,
            combat_actions: 0,
            exploration_actions: 0,
            social_actions: 0,
            items_used: 0,
            turns_played: 0,
            start_time,
            survival_time: 0,
        }
    }

    /// Record one completed turn and the categories its action fell into.
    pub fn record_turn(&mut self, categories: ActionCategories) {
        self.turns_played = self.turns_played.saturating_add(1);
        self.decisions_count = self.decisions_count.saturating_add(1);
        if categories.combat {
            self.combat_actions = self.combat_actions.saturating_add(1);
        }
        if categories.exploration {
            self.exploration_actions = self.exploration_actions.saturating_add(1);
        }
        if categories.social {
            self.social_actions = self.social_actions.saturating_add(1);
        }
    }

    /// Record that an inventory item was used.
    pub fn record_item_used(&mut self) {
        self.items_used = self.items_used.saturating_add(1);
    }

    /// Recompute [`survival_time`](Self::survival_time) as whole minutes since start.
    pub fn refresh_survival_time(&mut self, now: DateTime<Utc>) {
        let minutes = (now - self.start_time).num_minutes().max(0);
        self.survival_time = u32::try_from(minutes).unwrap_or(u32::MAX);
    }

    /// One line per counter, used when asking the narrator for an ending scene.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Turnos jugados: {}\nDecisiones: {}\nAcciones de combate: {}\nAcciones de exploración: {}\nAcciones sociales: {}\nItems usados: {}\nTiempo de supervivencia: {} min",
            self.turns_played,
            self.decisions_count,
            self.combat_actions,
            self.exploration_actions,
            self.social_actions,
            self.items_used,
            self.survival_time,
        )
    }
}

impl Default for GameStatistics {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn record_turn_bumps_each_flagged_category() {
        let mut stats = GameStatistics::default();
        stats.record_turn(ActionCategories {
            combat: true,
            exploration: false,
            social: true,
        });
        stats.record_turn(ActionCategories::default());

        assert_eq!(stats.turns_played, 2);
        assert_eq!(stats.decisions_count, 2);
        assert_eq!(stats.combat_actions, 1);
        assert_eq!(stats.social_actions, 1);
        assert_eq!(stats.exploration_actions, 0);
    }

    #[test]
    fn survival_time_is_whole_minutes() {
        let start = Utc::now();
        let mut stats = GameStatistics::new(start);
        stats.refresh_survival_time(start + Duration::seconds(185));
        assert_eq!(stats.survival_time, 3);
    }

    #[test]
    fn survival_time_never_negative() {
        let start = Utc::now();
        let mut stats = GameStatistics::new(start);
        stats.refresh_survival_time(start - Duration::minutes(10));
        assert_eq!(stats.survival_time, 0);
    }
}
