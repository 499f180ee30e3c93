//! Core type definitions shared by the classifier, the rules and the stores.
//!
//! All types are serializable; the JSON shape is what the save stores persist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of the player who owns a save.
///
/// Issued by the (external) account layer; treated as an opaque string here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Wrap an account identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a saved game.
    SaveId
);
uuid_id!(
    /// Unique identifier for a chat message.
    MessageId
);
uuid_id!(
    /// Unique identifier for an inventory item.
    ItemId
);

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player.
    User,
    /// The narrator.
    Assistant,
}

impl Role {
    /// Stable lowercase name, used in prompts and in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// An illustration attached to a narrator message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes.
    pub base64_data: String,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
}

impl GeneratedImage {
    /// A PNG image from base64 data.
    #[must_use]
    pub fn png(base64_data: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            media_type: "image/png".to_string(),
        }
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Message identity.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Illustration, if one was generated for this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<GeneratedImage>,
    /// Items the narrator mentioned in this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items_found: Vec<InventoryItem>,
}

impl GameMessage {
    /// A player message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// A narrator message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            image: None,
            items_found: Vec::new(),
        }
    }

    /// Attach an illustration.
    #[must_use]
    pub fn with_image(mut self, image: GeneratedImage) -> Self {
        self.image = Some(image);
        self
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Inventory item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Weapons and anything used to fight.
    Weapon,
    /// Food and drink.
    Food,
    /// Medicine, bandages, first aid.
    Medical,
    /// Flashlights, rope and other utilities.
    Tool,
    /// Keys and access cards.
    Key,
    /// Everything else.
    Misc,
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weapon" => Ok(Self::Weapon),
            "food" => Ok(Self::Food),
            "medical" => Ok(Self::Medical),
            "tool" => Ok(Self::Tool),
            "key" => Ok(Self::Key),
            "misc" => Ok(Self::Misc),
            other => Err(format!("unknown item type '{other}'")),
        }
    }
}

/// A stack of identical items in the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item identity.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Category.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Whether the player can use it directly.
    pub usable: bool,
    /// Stack size, always ≥ 1 while the item is held.
    pub quantity: u32,
    /// Emoji shown next to the name.
    pub icon: String,
}

impl InventoryItem {
    /// A single new item with a fresh id.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        item_type: ItemType,
        usable: bool,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            description: description.into(),
            item_type,
            usable,
            quantity: 1,
            icon: icon.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_serializes_lowercase() {
        let item = InventoryItem::new("Botiquín", "Vendas y alcohol", ItemType::Medical, true, "🩹");
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "medical");
        assert_eq!(json["quantity"], 1);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Assistant] {
            assert_eq!(role.as_str().parse::<Role>().expect("parse"), role);
        }
        assert!("narrator".parse::<Role>().is_err());
    }

    #[test]
    fn save_id_parses_its_display_form() {
        let id = SaveId::new();
        let parsed: SaveId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn message_without_image_omits_optional_fields() {
        let msg = GameMessage::user("Abro la puerta");
        let json = serde_json::to_value(&msg).expect("serialize");
        assert!(json.get("image").is_none());
        assert!(json.get("items_found").is_none());
    }
}
