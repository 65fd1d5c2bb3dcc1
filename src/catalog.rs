//! Canonical set of known items

use std::collections::HashMap;

use crate::error::{PlanError, Result};
use crate::models::Item;

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, replacing any existing entry with the same id in place.
    pub fn insert(&mut self, item: Item) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    /// Add an item only if its id is not known yet.
    pub fn ensure(&mut self, id: &str) {
        if !self.contains(id) {
            self.insert(Item::new(id, id));
        }
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Display name, falling back to the id for unknown items.
    pub fn display<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |item| item.display.as_str())
    }

    pub fn mark_raw(&mut self, id: &str) -> Result<()> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| PlanError::UnknownItem(id.to_string()))?;
        self.items[pos].raw = true;
        Ok(())
    }

    pub fn is_raw(&self, id: &str) -> bool {
        self.get(id).is_some_and(|item| item.raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Item> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut catalog = ItemCatalog::new();
        for item in iter {
            catalog.insert(item);
        }
        catalog
    }
}
