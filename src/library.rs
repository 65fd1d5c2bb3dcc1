//! Recipe library: candidate recipes per output item and recipe selection

use std::collections::{BTreeMap, HashMap};

use crate::catalog::ItemCatalog;
use crate::error::{PlanError, Result};
use crate::models::Recipe;

/// Recipes in declared priority order, plus the user's chosen default per output item.
#[derive(Debug, Clone, Default)]
pub struct RecipeLibrary {
    recipes: Vec<Recipe>,
    index: HashMap<String, usize>,
    defaults: BTreeMap<String, String>,
}

impl RecipeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a recipe at the lowest priority.
    pub fn insert(&mut self, recipe: Recipe, catalog: &ItemCatalog) -> Result<()> {
        if self.index.contains_key(&recipe.id) {
            return Err(PlanError::DuplicateRecipe(recipe.id));
        }
        Self::check(&recipe, catalog)?;
        self.index.insert(recipe.id.clone(), self.recipes.len());
        self.recipes.push(recipe);
        Ok(())
    }

    /// Insert or replace a recipe, keeping the priority of the version it replaces.
    pub fn upsert(&mut self, recipe: Recipe, catalog: &ItemCatalog) -> Result<()> {
        let existing = self.index.get(&recipe.id).copied();
        let Some(pos) = existing else {
            return self.insert(recipe, catalog);
        };
        Self::check(&recipe, catalog)?;
        self.defaults
            .retain(|item, id| *id != recipe.id || recipe.produces(item));
        self.recipes[pos] = recipe;
        Ok(())
    }

    fn check(recipe: &Recipe, catalog: &ItemCatalog) -> Result<()> {
        recipe.validate()?;
        match recipe.items().find(|item| !catalog.contains(item)) {
            Some(unknown) => Err(PlanError::UnknownItem(unknown.to_string())),
            None => Ok(()),
        }
    }

    /// Mark `recipe_id` as the preferred recipe for `item`.
    pub fn set_default(&mut self, item: &str, recipe_id: &str) -> Result<()> {
        let recipe = self
            .get(recipe_id)
            .ok_or_else(|| PlanError::UnknownRecipe(recipe_id.to_string()))?;
        if !recipe.produces(item) {
            return Err(PlanError::InvalidRecipe {
                id: recipe_id.to_string(),
                reason: format!("does not produce '{}'", item),
            });
        }
        self.defaults.insert(item.to_string(), recipe_id.to_string());
        Ok(())
    }

    pub fn clear_default(&mut self, item: &str) {
        self.defaults.remove(item);
    }

    pub fn default_for(&self, item: &str) -> Option<&str> {
        self.defaults.get(item).map(String::as_str)
    }

    /// (item, recipe id) pairs, sorted by item.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, recipe_id: &str) -> Option<&Recipe> {
        self.index.get(recipe_id).map(|&pos| &self.recipes[pos])
    }

    /// Candidate recipes for an item in priority order.
    pub fn recipes_for<'a, 'b>(
        &'a self,
        item: &'b str,
    ) -> impl Iterator<Item = &'a Recipe> + use<'a, 'b> {
        self.recipes.iter().filter(move |r| r.produces(item))
    }

    pub fn has_recipe(&self, item: &str) -> bool {
        self.recipes_for(item).next().is_some()
    }

    /// Pick the recipe used to produce `item`.
    ///
    /// The user's default wins when it still produces the item; otherwise the first
    /// candidate in priority order.
    pub fn select(&self, item: &str) -> Result<&Recipe> {
        if let Some(recipe) = self
            .default_for(item)
            .and_then(|id| self.get(id))
            .filter(|r| r.produces(item))
        {
            return Ok(recipe);
        }
        self.recipes_for(item)
            .next()
            .ok_or_else(|| PlanError::NoRecipe {
                item: item.to_string(),
            })
    }

    /// First unused id of the form `item`, `item_2`, `item_3`, ...
    pub fn next_recipe_id(&self, item: &str) -> String {
        let base = match item.trim() {
            "" => "recipe",
            s => s,
        };
        if !self.index.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !self.index.contains_key(id))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
