//! Ending detection: the seven ways a playthrough can end.
//!
//! The evaluator looks at two things only: the accumulated
//! [`GameStatistics`] and the text of the most recent message. Rules are
//! checked in a fixed priority order and the first match wins, so dying
//! (rules 1–2) always beats a happier outcome described in the same message.
//!
//! | # | Ending             | Counters                              | Text                                   |
//! |---|--------------------|---------------------------------------|----------------------------------------|
//! | 1 | `death-combat`     | combat ≥ 3                            | muerte, mueres, has muerto, zombie+muerde |
//! | 2 | `infection-turned` | —                                     | infectado, mordida, virus+conviertes   |
//! | 3 | `cure-found`       | medical item, exploration ≥ 4         | cura, antídoto, laboratorio            |
//! | 4 | `escape-safe`      | exploration ≥ 5                       | escapas, logras salir, refugio/zona segura |
//! | 5 | `sacrifice-hero`   | social ≥ 3                            | sacrificas, salvar a otros, dar tu vida |
//! | 6 | `leader-group`     | social ≥ 5, turns ≥ 10                | líder, grupo, comunidad                |
//! | 7 | `survivor-lone`    | turns ≥ 12, social ≤ 1, exploration ≥ 6 | —                                    |
//!
//! Nothing can trigger before [`MIN_TURNS_FOR_ENDING`] turns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::inventory::Inventory;
use crate::statistics::GameStatistics;
use crate::types::{GameMessage, ItemType};

/// Turns that must be played before any ending can trigger.
pub const MIN_TURNS_FOR_ENDING: u32 = 5;

/// Broad category of an ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndingType {
    /// Killed in a fight.
    Death,
    /// Reached safety.
    Escape,
    /// Found the cure.
    Cure,
    /// Gave their life for others.
    Sacrifice,
    /// Turned into a zombie.
    Infection,
    /// Survived alone.
    Survivor,
    /// Leads a group of survivors.
    Leader,
}

impl EndingType {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Death => "death",
            Self::Escape => "escape",
            Self::Cure => "cure",
            Self::Sacrifice => "sacrifice",
            Self::Infection => "infection",
            Self::Survivor => "survivor",
            Self::Leader => "leader",
        }
    }
}

impl fmt::Display for EndingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the ending catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameEnding {
    /// Stable id, persisted in the unlocked-endings ledger.
    pub id: &'static str,
    /// Category.
    pub ending_type: EndingType,
    /// Title shown on the ending screen.
    pub title: &'static str,
    /// One-sentence epilogue.
    pub description: &'static str,
}

/// The fixed ending catalog.
pub static GAME_ENDINGS: [GameEnding; 7] = [
    GameEnding {
        id: "death-combat",
        ending_type: EndingType::Death,
        title: "Muerte en Combate",
        description: "Caíste en batalla contra los zombies. Tu valentía será recordada.",
    },
    GameEnding {
        id: "escape-safe",
        ending_type: EndingType::Escape,
        title: "Escape Exitoso",
        description: "Lograste escapar de la zona infectada y encontraste refugio seguro.",
    },
    GameEnding {
        id: "cure-found",
        ending_type: EndingType::Cure,
        title: "La Cura",
        description: "Encontraste los componentes necesarios para desarrollar la cura del virus.",
    },
    GameEnding {
        id: "sacrifice-hero",
        ending_type: EndingType::Sacrifice,
        title: "Sacrificio Heroico",
        description: "Te sacrificaste para salvar a otros supervivientes.",
    },
    GameEnding {
        id: "infection-turned",
        ending_type: EndingType::Infection,
        title: "Infectado",
        description: "El virus te alcanzó. Ahora eres uno de ellos.",
    },
    GameEnding {
        id: "survivor-lone",
        ending_type: EndingType::Survivor,
        title: "Superviviente Solitario",
        description: "Sobreviviste solo, adaptándote al nuevo mundo.",
    },
    GameEnding {
        id: "leader-group",
        ending_type: EndingType::Leader,
        title: "Líder de Supervivientes",
        description: "Te convertiste en el líder de un grupo de supervivientes.",
    },
];

/// Look up an ending by id.
#[must_use]
pub fn ending_by_id(id: &str) -> Option<&'static GameEnding> {
    GAME_ENDINGS.iter().find(|e| e.id == id)
}

/// Look up an ending by type. Each type appears once in the catalog.
#[must_use]
pub fn ending_by_type(ending_type: EndingType) -> Option<&'static GameEnding> {
    GAME_ENDINGS.iter().find(|e| e.ending_type == ending_type)
}

fn catalog(id: &str) -> Option<&'static GameEnding> {
    let ending = ending_by_id(id);
    debug_assert!(ending.is_some(), "ending {id} missing from catalog");
    ending
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Decide whether the latest narrative turn ends the game.
///
/// Only the lowercased `last_text` and the counters are inspected. Returns
/// `None` while the game should continue; that is not an error.
#[must_use]
pub fn evaluate(
    stats: &GameStatistics,
    inventory: &Inventory,
    last_text: &str,
) -> Option<&'static GameEnding> {
    if stats.turns_played < MIN_TURNS_FOR_ENDING {
        return None;
    }

    let text = last_text.to_lowercase();

    // 1. Death in combat
    let deadly = contains_any(&text, &["muerte", "mueres", "has muerto"])
        || (text.contains("zombie") && text.contains("muerde"));
    if stats.combat_actions >= 3 && deadly {
        return catalog("death-combat");
    }

    // 2. Infection
    if contains_any(&text, &["infectado", "mordida"])
        || (text.contains("virus") && text.contains("conviertes"))
    {
        return catalog("infection-turned");
    }

    // 3. Cure
    if inventory.has_type(ItemType::Medical)
        && stats.exploration_actions >= 4
        && contains_any(&text, &["cura", "antídoto", "laboratorio"])
    {
        return catalog("cure-found");
    }

    // 4. Escape
    if stats.exploration_actions >= 5
        && contains_any(&text, &["escapas", "logras salir", "refugio seguro", "zona segura"])
    {
        return catalog("escape-safe");
    }

    // 5. Sacrifice
    if stats.social_actions >= 3
        && contains_any(&text, &["sacrificas", "salvar a otros", "dar tu vida"])
    {
        return catalog("sacrifice-hero");
    }

    // 6. Leader
    if stats.social_actions >= 5
        && stats.turns_played >= 10
        && contains_any(&text, &["líder", "grupo", "comunidad"])
    {
        return catalog("leader-group");
    }

    // 7. Lone survivor: thresholds only.
    if stats.turns_played >= 12 && stats.social_actions <= 1 && stats.exploration_actions >= 6 {
        return catalog("survivor-lone");
    }

    None
}

/// [`evaluate`] against the last message of a conversation history.
///
/// An empty history is evaluated as empty text.
#[must_use]
pub fn check_ending_conditions(
    stats: &GameStatistics,
    inventory: &Inventory,
    history: &[GameMessage],
) -> Option<&'static GameEnding> {
    let last = history.last().map_or("", |m| m.content.as_str());
    evaluate(stats, inventory, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InventoryItem;

    fn stats(turns: u32, combat: u32, exploration: u32, social: u32) -> GameStatistics {
        GameStatistics {
            turns_played: turns,
            combat_actions: combat,
            exploration_actions: exploration,
            social_actions: social,
            ..GameStatistics::default()
        }
    }

    fn id(ending: Option<&GameEnding>) -> Option<&str> {
        ending.map(|e| e.id)
    }

    #[test]
    fn catalog_ids_are_unique_and_cover_every_type() {
        let mut ids: Vec<_> = GAME_ENDINGS.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 7);
        for t in [
            EndingType::Death,
            EndingType::Escape,
            EndingType::Cure,
            EndingType::Sacrifice,
            EndingType::Infection,
            EndingType::Survivor,
            EndingType::Leader,
        ] {
            assert_eq!(ending_by_type(t).map(|e| e.ending_type), Some(t));
        }
    }

    #[test]
    fn nothing_before_five_turns() {
        let s = stats(4, 10, 10, 10);
        assert!(evaluate(&s, &Inventory::default(), "mueres infectado zona segura").is_none());
    }

    #[test]
    fn zombie_bite_after_combat_is_death() {
        let s = stats(6, 3, 0, 0);
        let got = evaluate(&s, &Inventory::default(), "zombie te muerde y mueres");
        assert_eq!(id(got), Some("death-combat"));
    }

    #[test]
    fn death_needs_three_combat_actions() {
        let s = stats(6, 2, 0, 0);
        assert!(evaluate(&s, &Inventory::default(), "Has muerto.").is_none());
    }

    #[test]
    fn escape_through_back_door() {
        let s = stats(8, 0, 5, 0);
        let got = evaluate(
            &s,
            &Inventory::default(),
            "logras salir por la puerta trasera hacia la zona segura",
        );
        assert_eq!(id(got), Some("escape-safe"));
    }

    #[test]
    fn death_outranks_escape() {
        let s = stats(8, 3, 5, 0);
        let got = evaluate(&s, &Inventory::default(), "Logras salir, pero mueres en la zona segura");
        assert_eq!(id(got), Some("death-combat"));
    }

    #[test]
    fn infection_has_no_counter_requirement() {
        let s = stats(5, 0, 0, 0);
        assert_eq!(
            id(evaluate(&s, &Inventory::default(), "Notas la MORDIDA en tu brazo")),
            Some("infection-turned")
        );
        assert_eq!(
            id(evaluate(&s, &Inventory::default(), "el virus avanza y te conviertes")),
            Some("infection-turned")
        );
        assert!(evaluate(&s, &Inventory::default(), "el virus avanza").is_none());
    }

    #[test]
    fn cure_requires_medical_item() {
        let s = stats(7, 0, 4, 0);
        let text = "En el laboratorio encuentras el antídoto";
        assert!(evaluate(&s, &Inventory::default(), text).is_none());

        let mut inv = Inventory::default();
        inv.add(InventoryItem::new("Jeringa", "Vacía", ItemType::Medical, true, "💉"))
            .expect("add");
        assert_eq!(id(evaluate(&s, &inv, text)), Some("cure-found"));
    }

    #[test]
    fn sacrifice_and_leader() {
        let inv = Inventory::default();
        assert_eq!(
            id(evaluate(&stats(6, 0, 0, 3), &inv, "Decides dar tu vida por ellos")),
            Some("sacrifice-hero")
        );
        assert_eq!(
            id(evaluate(&stats(10, 0, 0, 5), &inv, "El grupo te elige como su LÍDER")),
            Some("leader-group")
        );
        assert!(evaluate(&stats(9, 0, 0, 5), &inv, "El grupo te elige como su líder").is_none());
    }

    #[test]
    fn lone_survivor_is_threshold_only() {
        let inv = Inventory::default();
        assert_eq!(
            id(evaluate(&stats(12, 0, 6, 1), &inv, "Amanece otra vez.")),
            Some("survivor-lone")
        );
        assert!(evaluate(&stats(12, 0, 6, 2), &inv, "Amanece otra vez.").is_none());
    }

    #[test]
    fn history_uses_only_last_message() {
        let s = stats(6, 3, 0, 0);
        let history = vec![
            GameMessage::assistant("Un zombie te muerde"),
            GameMessage::assistant("Te curas la herida y sigues adelante"),
        ];
        assert!(check_ending_conditions(&s, &Inventory::default(), &history).is_none());
        assert!(check_ending_conditions(&s, &Inventory::default(), &[]).is_none());
    }
}
