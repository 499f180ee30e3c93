//! The player's inventory.
//!
//! Items come from narrative extraction, which hands out a fresh id every
//! time an item is mentioned. Stacking therefore happens on id first and on
//! case-insensitive name second; a stack disappears when its quantity reaches
//! zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RefugioError, Result};
use crate::types::{InventoryItem, ItemId, ItemType};

/// Ordered collection of item stacks with a cap on distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<InventoryItem>,
    max_items: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Inventory {
    /// Empty inventory holding at most `max_items` distinct stacks.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items,
        }
    }

    /// Rebuild from a saved item list.
    ///
    /// Saved lists are trusted as-is, even when they exceed the cap.
    #[must_use]
    pub fn from_items(items: Vec<InventoryItem>, max_items: usize) -> Self {
        Self { items, max_items }
    }

    /// Current stacks, in acquisition order.
    #[must_use]
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    /// Consume the inventory, returning its stacks.
    #[must_use]
    pub fn into_items(self) -> Vec<InventoryItem> {
        self.items
    }

    /// Number of distinct stacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a stack by id.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Whether any stack has the given type.
    #[must_use]
    pub fn has_type(&self, item_type: ItemType) -> bool {
        self.items.iter().any(|i| i.item_type == item_type)
    }

    /// Lowercased names, handed to the item extractor so it skips what the
    /// player already carries.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|i| i.name.to_lowercase()).collect()
    }

    /// `"name (xN), …"` for prompts. Empty string when there is nothing.
    #[must_use]
    pub fn summary(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{} (x{})", i.name, i.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Add an item, stacking onto an existing entry when possible.
    ///
    /// Returns the id of the stack that now holds the item.
    ///
    /// # Errors
    ///
    /// Returns [`RefugioError::InventoryFull`] when a new stack would exceed
    /// the cap.
    pub fn add(&mut self, item: InventoryItem) -> Result<ItemId> {
        let quantity = item.quantity.max(1);
        let name = item.name.to_lowercase();

        if let Some(stack) = self.items.iter_mut().find(|i| i.id == item.id) {
            stack.quantity = stack.quantity.saturating_add(quantity);
            return Ok(stack.id);
        }

        if let Some(stack) = self.items.iter_mut().find(|i| i.name.to_lowercase() == name) {
            stack.quantity = stack.quantity.saturating_add(quantity);
            debug!(item = %stack.name, quantity = stack.quantity, "Stacked item by name");
            return Ok(stack.id);
        }

        if self.items.len() >= self.max_items {
            return Err(RefugioError::InventoryFull {
                limit: self.max_items,
            });
        }

        let id = item.id;
        self.items.push(InventoryItem { quantity, ..item });
        Ok(id)
    }

    /// Use one unit of a usable item, removing the stack when it runs out.
    ///
    /// Returns a copy of the stack as it was before use.
    ///
    /// # Errors
    ///
    /// [`RefugioError::ItemNotFound`] for an unknown id,
    /// [`RefugioError::ItemNotUsable`] for items that cannot be used directly.
    pub fn use_item(&mut self, id: ItemId) -> Result<InventoryItem> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(RefugioError::ItemNotFound(id))?;

        if !self.items[pos].usable {
            return Err(RefugioError::ItemNotUsable(self.items[pos].name.clone()));
        }

        let before = self.items[pos].clone();
        self.items[pos].quantity = self.items[pos].quantity.saturating_sub(1);
        if self.items[pos].quantity == 0 {
            self.items.remove(pos);
        }
        Ok(before)
    }

    /// Drop a whole stack.
    ///
    /// # Errors
    ///
    /// [`RefugioError::ItemNotFound`] for an unknown id.
    pub fn remove(&mut self, id: ItemId) -> Result<InventoryItem> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(RefugioError::ItemNotFound(id))?;
        Ok(self.items.remove(pos))
    }
}
