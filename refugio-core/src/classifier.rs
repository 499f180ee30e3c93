//! Action classification — free-text player input → coarse categories.
//!
//! Each turn the player's text is matched against three keyword sets. The
//! categories are independent: "atacar al grupo" is both combat and social,
//! and each flagged category bumps its own statistics counter.
//!
//! Keywords are word stems. A single-word keyword matches when any word of
//! the lowercased input starts with it ("atac" matches "ataco", "atacar",
//! "atacamos"); a keyword containing a space is matched as a phrase.
//! Words on the ignore list ("armario", "entre") never count as a stem hit.

use serde::{Deserialize, Serialize};

/// Which categories a player action falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCategories {
    /// Fighting, shooting, defending.
    pub combat: bool,
    /// Searching, opening, moving around.
    pub exploration: bool,
    /// Talking, helping, joining people.
    pub social: bool,
}

impl ActionCategories {
    /// Whether no category matched.
    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.combat || self.exploration || self.social)
    }
}

/// Keyword stems per category. Loaded from the `[classifier]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSets {
    /// Combat stems.
    #[serde(default = "default_combat")]
    pub combat: Vec<String>,
    /// Exploration stems.
    #[serde(default = "default_exploration")]
    pub exploration: Vec<String>,
    /// Social stems.
    #[serde(default = "default_social")]
    pub social: Vec<String>,
    /// Whole words a stem would otherwise catch by accident.
    #[serde(default = "default_ignored")]
    pub ignored: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            combat: default_combat(),
            exploration: default_exploration(),
            social: default_social(),
            ignored: default_ignored(),
        }
    }
}

fn stems(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_combat() -> Vec<String> {
    stems(&[
        "atac", "ataqu", "luch", "pele", "dispar", "golpe", "defend", "defiend", "arma",
        "mata", "mato", "matar", "elimin", "apuñal",
    ])
}

fn default_exploration() -> Vec<String> {
    stems(&[
        "busc", "explor", "examin", "investig", "revis", "mir", "inspeccion", "abr", "ir",
        "voy", "camin", "avanz", "entr",
    ])
}

fn default_social() -> Vec<String> {
    stems(&[
        "habl", "pregunt", "ayud", "grit", "llam", "convers", "unir", "únete", "grupo",
        "person", "gente", "convenc", "negoci",
    ])
}

fn default_ignored() -> Vec<String> {
    stems(&[
        "armario", "armarios", "abrazo", "abrazos", "abrazar", "abraza", "abrazas",
        "entre",
    ])
}

/// Compiled keyword matcher.
#[derive(Debug, Clone)]
pub struct ActionClassifier {
    combat: Vec<String>,
    exploration: Vec<String>,
    social: Vec<String>,
    ignored: Vec<String>,
}

impl Default for ActionClassifier {
    fn default() -> Self {
        Self::new(&KeywordSets::default())
    }
}

impl ActionClassifier {
    /// Build a classifier from keyword sets. Keywords are lowercased and
    /// blank entries dropped.
    #[must_use]
    pub fn new(sets: &KeywordSets) -> Self {
        Self {
            combat: normalize(&sets.combat),
            exploration: normalize(&sets.exploration),
            social: normalize(&sets.social),
            ignored: normalize(&sets.ignored),
        }
    }

    /// Classify a player action. Never fails; unmatched text yields all `false`.
    #[must_use]
    pub fn classify(&self, text: &str) -> ActionCategories {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !self.ignored.iter().any(|i| i == w))
            .collect();

        ActionCategories {
            combat: matches_any(&self.combat, &lowered, &words),
            exploration: matches_any(&self.exploration, &lowered, &words),
            social: matches_any(&self.social, &lowered, &words),
        }
    }
}

/// Classify with the built-in keyword sets.
#[must_use]
pub fn classify(text: &str) -> ActionCategories {
    ActionClassifier::default().classify(text)
}

fn normalize(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn matches_any(keywords: &[String], lowered: &str, words: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        if keyword.contains(' ') {
            lowered.contains(keyword.as_str())
        } else {
            words.iter().any(|w| w.starts_with(keyword.as_str()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_with_bat_is_combat_only() {
        let result = classify("Ataco al zombie con el bate");
        assert_eq!(
            result,
            ActionCategories {
                combat: true,
                exploration: false,
                social: false,
            }
        );
    }

    #[test]
    fn categories_are_not_exclusive() {
        let result = classify("atacar al grupo");
        assert!(result.combat);
        assert!(result.social);
        assert!(!result.exploration);
    }

    #[test]
    fn exploration_verbs() {
        assert!(classify("Busco comida en la cocina").exploration);
        assert!(classify("Abro la puerta del sótano").exploration);
        assert!(classify("Voy hacia el hospital").exploration);
    }

    #[test]
    fn social_verbs() {
        let result = classify("Hablo con la mujer y le pregunto por su hija");
        assert!(result.social);
        assert!(!result.combat);
    }

    #[test]
    fn unmatched_text_is_all_false() {
        assert!(classify("...").is_empty());
        assert!(classify("").is_empty());
    }

    #[test]
    fn matching_ignores_case() {
        assert!(classify("DISPARO A LA CABEZA").combat);
    }

    #[test]
    fn stems_only_match_word_starts() {
        // "ir" must not fire on words that merely contain it.
        assert!(!classify("Suspiro").exploration);
    }

    #[test]
    fn ignored_words_do_not_trigger_stems() {
        let wardrobe = classify("Busco en el armario");
        assert!(wardrobe.exploration);
        assert!(!wardrobe.combat);
        assert!(!classify("Le doy un abrazo").exploration);
        assert!(!classify("Me escondo entre los coches").exploration);

        assert!(classify("Cojo el arma").combat);
        assert!(classify("Entro en la casa").exploration);
    }

    #[test]
    fn custom_keyword_sets_replace_builtins() {
        let sets = KeywordSets {
            combat: vec!["Attack".into()],
            exploration: vec!["look around".into()],
            social: vec![],
            ignored: vec![],
        };
        let classifier = ActionClassifier::new(&sets);
        let result = classifier.classify("I attack, then LOOK AROUND");
        assert!(result.combat);
        assert!(result.exploration);
        assert!(!result.social);
        assert!(!classifier.classify("Ataco al zombie").combat);
    }
}
