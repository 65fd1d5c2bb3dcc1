//! Database schema and operations

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::catalog::ItemCatalog;
use crate::library::RecipeLibrary;
use crate::models::{Item, Plan, Recipe, Stack};
use crate::tier::Tier;

/// Number of plans kept in the history table unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            display TEXT NOT NULL,
            raw INTEGER NOT NULL DEFAULT 0
        );

        -- priority orders candidate recipes for the same output
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            machine TEXT NOT NULL,
            duration_ticks INTEGER NOT NULL,
            base_eut TEXT NOT NULL,
            base_tier TEXT NOT NULL,
            overclockable INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            priority INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            quantity TEXT NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            quantity TEXT NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        -- user's chosen recipe per output item
        CREATE TABLE IF NOT EXISTS recipe_defaults (
            item_id TEXT PRIMARY KEY,
            recipe_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS plan_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_item TEXT NOT NULL,
            target_rate TEXT NOT NULL,
            default_tier TEXT NOT NULL,
            created_at TEXT NOT NULL,
            plan_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_item ON recipe_outputs(item_id);
        CREATE INDEX IF NOT EXISTS idx_recipes_priority ON recipes(priority);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT INTO items (id, display, raw) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET display = excluded.display, raw = excluded.raw",
        params![item.id, item.display, item.raw],
    )?;
    Ok(())
}

pub fn set_raw(conn: &Connection, item_id: &str, raw: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE items SET raw = ?2 WHERE id = ?1",
        params![item_id, raw],
    )?;
    if updated == 0 {
        anyhow::bail!("Item '{}' not found", item_id);
    }
    Ok(())
}

/// Load every item in insertion order
pub fn load_catalog(conn: &Connection) -> Result<ItemCatalog> {
    let mut stmt = conn.prepare("SELECT id, display, raw FROM items ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        Ok(Item {
            id: row.get(0)?,
            display: row.get(1)?,
            raw: row.get(2)?,
        })
    })?;

    let mut catalog = ItemCatalog::new();
    for row in rows {
        catalog.insert(row?);
    }
    Ok(catalog)
}

/// Insert or replace a recipe; a new recipe gets the lowest priority
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO recipes (id, machine, duration_ticks, base_eut, base_tier, overclockable, notes, priority)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, (SELECT COALESCE(MAX(priority), 0) + 1 FROM recipes))
         ON CONFLICT(id) DO UPDATE SET
            machine = excluded.machine,
            duration_ticks = excluded.duration_ticks,
            base_eut = excluded.base_eut,
            base_tier = excluded.base_tier,
            overclockable = excluded.overclockable,
            notes = excluded.notes",
        params![
            recipe.id,
            recipe.machine,
            recipe.duration_ticks as i64,
            recipe.base_eut.to_string(),
            recipe.base_tier.name(),
            recipe.overclockable,
            recipe.notes,
        ],
    )?;
    tx.execute("DELETE FROM recipe_inputs WHERE recipe_id = ?1", [&recipe.id])?;
    tx.execute("DELETE FROM recipe_outputs WHERE recipe_id = ?1", [&recipe.id])?;
    for (table, stacks) in [
        ("recipe_inputs", &recipe.inputs),
        ("recipe_outputs", &recipe.outputs),
    ] {
        for (position, stack) in stacks.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {} (recipe_id, position, item_id, quantity) VALUES (?1, ?2, ?3, ?4)",
                    table
                ),
                params![recipe.id, position as i64, stack.item, stack.quantity.to_string()],
            )?;
        }
    }
    // Drop defaults pointing at outputs this version no longer produces
    tx.execute(
        "DELETE FROM recipe_defaults WHERE recipe_id = ?1
         AND item_id NOT IN (SELECT item_id FROM recipe_outputs WHERE recipe_id = ?1)",
        [&recipe.id],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn set_default_recipe(conn: &Connection, item_id: &str, recipe_id: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO recipe_defaults (item_id, recipe_id) VALUES (?1, ?2)
         ON CONFLICT(item_id) DO UPDATE SET recipe_id = excluded.recipe_id",
        params![item_id, recipe_id],
    )?;
    Ok(())
}

/// Persist a whole catalog and library
pub fn store_library(conn: &Connection, catalog: &ItemCatalog, library: &RecipeLibrary) -> Result<()> {
    for item in catalog.iter() {
        upsert_item(conn, item)?;
    }
    for recipe in library.iter() {
        upsert_recipe(conn, recipe)?;
    }
    for (item, recipe_id) in library.defaults() {
        set_default_recipe(conn, item, recipe_id)?;
    }
    Ok(())
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn tier_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Tier> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn load_stacks(conn: &Connection, table: &str, recipe_id: &str) -> Result<Vec<Stack>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, quantity FROM {} WHERE recipe_id = ?1 ORDER BY position",
        table
    ))?;
    let rows = stmt.query_map([recipe_id], |row| {
        Ok(Stack {
            item: row.get(0)?,
            quantity: decimal_column(row, 1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all recipes in priority order
pub fn list_recipes(conn: &Connection) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, machine, duration_ticks, base_eut, base_tier, overclockable, notes
         FROM recipes ORDER BY priority, id",
    )?;
    let rows = stmt.query_map([], |row| {
        let mut recipe = Recipe::new(
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?.max(0) as u64,
            decimal_column(row, 3)?,
            tier_column(row, 4)?,
        );
        recipe.overclockable = row.get(5)?;
        recipe.notes = row.get(6)?;
        Ok(recipe)
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut recipe = row?;
        recipe.inputs = load_stacks(conn, "recipe_inputs", &recipe.id)?;
        recipe.outputs = load_stacks(conn, "recipe_outputs", &recipe.id)?;
        results.push(recipe);
    }
    Ok(results)
}

/// Build the in-memory library, validating each recipe against the catalog
pub fn load_library(conn: &Connection, catalog: &ItemCatalog) -> Result<RecipeLibrary> {
    let mut library = RecipeLibrary::new();
    for recipe in list_recipes(conn)? {
        let id = recipe.id.clone();
        library
            .insert(recipe, catalog)
            .with_context(|| format!("Stored recipe '{}' is invalid", id))?;
    }

    let mut stmt = conn.prepare("SELECT item_id, recipe_id FROM recipe_defaults")?;
    let defaults: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;
    for (item, recipe_id) in defaults {
        if let Err(e) = library.set_default(&item, &recipe_id) {
            warn!("Ignoring stored default for '{}': {}", item, e);
        }
    }

    debug!("Loaded {} recipes for {} items", library.len(), catalog.len());
    Ok(library)
}

/// Clear all recipes and items
pub fn clear_library(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_defaults;
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// One entry of the plan history
#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub id: i64,
    pub target_item: String,
    pub target_rate: Decimal,
    pub default_tier: Tier,
    pub created_at: DateTime<Utc>,
}

/// Store a plan and trim the history to the most recent `keep` entries
pub fn record_plan(conn: &Connection, plan: &Plan, keep: usize) -> Result<i64> {
    let json = serde_json::to_string(plan).context("Failed to serialize plan")?;
    conn.execute(
        "INSERT INTO plan_history (target_item, target_rate, default_tier, created_at, plan_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            plan.target_item,
            plan.target_rate.to_string(),
            plan.default_tier.name(),
            plan.created_at.to_rfc3339(),
            json
        ],
    )?;
    let id = conn.last_insert_rowid();
    conn.execute(
        "DELETE FROM plan_history WHERE id NOT IN
         (SELECT id FROM plan_history ORDER BY id DESC LIMIT ?1)",
        [keep as i64],
    )?;
    Ok(id)
}

/// Most recent plans first
pub fn recent_plans(conn: &Connection, limit: usize) -> Result<Vec<PlanRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, target_item, target_rate, default_tier, created_at
         FROM plan_history ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], |row| {
        let created: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);
        Ok(PlanRecord {
            id: row.get(0)?,
            target_item: row.get(1)?,
            target_rate: decimal_column(row, 2)?,
            default_tier: tier_column(row, 3)?,
            created_at,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn load_plan(conn: &Connection, id: i64) -> Result<Plan> {
    let json: String = conn
        .query_row(
            "SELECT plan_json FROM plan_history WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .with_context(|| format!("Plan {} not found in history", id))?;
    serde_json::from_str(&json).context("Stored plan is not valid JSON")
}
