//! Loading item lists and recipe books from disk
//!
//! Item lists are plain text: one item per line, either a bare id, a
//! `registry,display` pair, or a `[Display](registry)` token. Recipe books are
//! JSON files found by walking a directory. Plans are exported to and read back
//! from pretty-printed JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::ItemCatalog;
use crate::library::RecipeLibrary;
use crate::models::{Item, Plan, Recipe};
use crate::tier::{TICKS_PER_SECOND, Tier};

/// Turns raw item tokens into canonical ids and friendly display names.
pub struct ItemKeys {
    token_re: Regex,
    separator_re: Regex,
}

impl ItemKeys {
    pub fn new() -> Result<Self> {
        Ok(Self {
            token_re: Regex::new(r"^\[(?P<display>[^\]]*)\]\s*\((?P<registry>[^)]*)\)$")?,
            separator_re: Regex::new(r"[^a-z0-9]+")?,
        })
    }

    /// Split a `[Display](registry)` token; other tokens are their own display.
    pub fn split_token<'t>(&self, token: &'t str) -> (&'t str, &'t str) {
        let token = token.trim();
        match self.token_re.captures(token) {
            Some(cap) => match (cap.name("registry"), cap.name("display")) {
                (Some(registry), Some(display)) => {
                    (registry.as_str().trim(), display.as_str().trim())
                }
                _ => (token, token),
            },
            None => (token, token),
        }
    }

    /// Lowercase id with every run of non-alphanumerics collapsed to `_`.
    pub fn canonical_key(&self, raw: &str) -> String {
        let (registry, _) = self.split_token(raw);
        let lowered = registry.to_lowercase();
        let key = self.separator_re.replace_all(&lowered, "_");
        match key.trim_matches('_') {
            "" => "item".to_string(),
            key => key.to_string(),
        }
    }

    /// Friendly name: mod prefix dropped, underscores to spaces, words capitalised.
    pub fn display_for(&self, raw: &str) -> String {
        let (registry, display) = self.split_token(raw);
        let candidate = if display.is_empty() || display == registry {
            registry
        } else {
            display
        };
        let candidate = candidate
            .split_once(':')
            .map_or(candidate, |(_, name)| name)
            .replace("_mb", " (mB)")
            .replace('_', " ");

        let words: Vec<String> = candidate
            .split_whitespace()
            .map(|word| {
                if word.eq_ignore_ascii_case("mb") {
                    return "mB".to_string();
                }
                if word.starts_with('(') {
                    return word.to_string();
                }
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect();

        match words.join(" ") {
            s if s.is_empty() => registry.to_string(),
            s => s,
        }
    }

    pub fn item(&self, raw: &str) -> Item {
        Item::new(self.canonical_key(raw), self.display_for(raw))
    }
}

/// Parse an item list file
pub fn load_item_list(path: &Path, keys: &ItemKeys) -> Result<Vec<Item>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_item_list(&content, keys))
}

pub fn parse_item_list(content: &str, keys: &ItemKeys) -> Vec<Item> {
    let mut items = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if lineno == 0 && line.to_uppercase().starts_with("REGISTRY") {
            continue;
        }

        let item = match line.split_once(',') {
            Some((registry, display)) => {
                let registry = registry.trim().trim_matches('"');
                let display = display.trim().trim_matches('"');
                let mut item = keys.item(registry);
                if !display.is_empty() && display != registry {
                    item.display = display.to_string();
                }
                item
            }
            None => keys.item(line),
        };
        items.push(item);
    }
    items
}

#[derive(Debug, Deserialize)]
struct RecipeBookFile {
    #[serde(default)]
    items: Vec<ItemEntry>,
    #[serde(default)]
    raw: Vec<String>,
    #[serde(default)]
    recipes: Vec<RecipeEntry>,
    #[serde(default, alias = "active_by_output")]
    defaults: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ItemEntry {
    #[serde(alias = "registry")]
    id: String,
    display: Option<String>,
    #[serde(default)]
    raw: bool,
}

#[derive(Debug, Deserialize)]
struct RecipeEntry {
    id: Option<String>,
    machine: String,
    time_s: Option<Value>,
    duration_ticks: Option<u64>,
    #[serde(default)]
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    base_eut: Value,
    base_tier: Option<String>,
    #[serde(default = "default_overclockable", alias = "gt_recipe")]
    overclockable: bool,
    notes: Option<String>,
}

fn default_overclockable() -> bool {
    true
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(|f| Decimal::from_str(&f.to_string()).ok()),
        },
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Whole ticks covering `seconds`; a partial tick counts as a full one.
fn seconds_to_ticks(seconds: Decimal) -> Option<u64> {
    if seconds <= Decimal::ZERO {
        return None;
    }
    seconds
        .checked_mul(Decimal::from(TICKS_PER_SECOND))?
        .ceil()
        .to_u64()
}

impl RecipeEntry {
    fn duration_ticks(&self) -> Result<u64> {
        if let Some(ticks) = self.duration_ticks {
            return Ok(ticks);
        }
        let time_s = self
            .time_s
            .as_ref()
            .ok_or_else(|| anyhow!("recipe needs time_s or duration_ticks"))?;
        decimal_value(time_s)
            .and_then(seconds_to_ticks)
            .ok_or_else(|| anyhow!("time_s must be a positive number, got {}", time_s))
    }

    fn into_recipe(self, id: String, keys: &ItemKeys) -> Result<Recipe> {
        let ticks = self.duration_ticks()?;
        let base_eut = decimal_value(&self.base_eut)
            .ok_or_else(|| anyhow!("base_eut is not a number: {}", self.base_eut))?;
        let base_tier = match &self.base_tier {
            Some(name) => name.parse::<Tier>()?,
            None => Tier::for_eut(base_eut)
                .ok_or_else(|| anyhow!("no tier can power {} EU/t", base_eut))?,
        };

        let mut recipe = Recipe::new(id, self.machine, ticks, base_eut, base_tier);
        recipe.overclockable = self.overclockable;
        recipe.notes = self.notes;
        for (raw, qty) in &self.inputs {
            let qty = decimal_value(qty).ok_or_else(|| anyhow!("bad quantity for input '{}'", raw))?;
            recipe = recipe.input(keys.canonical_key(raw), qty);
        }
        for (raw, qty) in &self.outputs {
            let qty = decimal_value(qty).ok_or_else(|| anyhow!("bad quantity for output '{}'", raw))?;
            recipe = recipe.output(keys.canonical_key(raw), qty);
        }
        Ok(recipe)
    }
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub recipes: usize,
    pub items: usize,
    pub defaults: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} recipes and {} new items from {} files ({} defaults). Skipped: {}, Errors: {}",
            self.recipes, self.items, self.files, self.defaults, self.skipped, self.errors
        )
    }
}

fn ensure_item(catalog: &mut ItemCatalog, keys: &ItemKeys, raw: &str, stats: &mut ImportStats) -> String {
    let key = keys.canonical_key(raw);
    if !catalog.contains(&key) {
        catalog.insert(Item::new(key.clone(), keys.display_for(raw)));
        stats.items += 1;
    }
    key
}

/// Merge one recipe book JSON document into the catalog and library
pub fn import_recipe_book(
    content: &str,
    keys: &ItemKeys,
    catalog: &mut ItemCatalog,
    library: &mut RecipeLibrary,
    stats: &mut ImportStats,
) -> Result<()> {
    let book: RecipeBookFile = serde_json::from_str(content).context("Invalid recipe book JSON")?;

    for entry in book.items {
        let key = keys.canonical_key(&entry.id);
        if !catalog.contains(&key) {
            stats.items += 1;
        }
        let display = entry.display.unwrap_or_else(|| keys.display_for(&entry.id));
        catalog.insert(Item {
            id: key,
            display,
            raw: entry.raw,
        });
    }

    for entry in book.recipes {
        for raw in entry.outputs.keys().chain(entry.inputs.keys()) {
            ensure_item(catalog, keys, raw, stats);
        }
        let id = match &entry.id {
            Some(id) => id.clone(),
            None => match entry.outputs.keys().next() {
                Some(first) => library.next_recipe_id(&keys.canonical_key(first)),
                None => {
                    warn!("Skipping recipe for {} with no outputs", entry.machine);
                    stats.skipped += 1;
                    continue;
                }
            },
        };

        match entry
            .into_recipe(id.clone(), keys)
            .and_then(|recipe| Ok(library.upsert(recipe, catalog)?))
        {
            Ok(()) => {
                debug!("Imported recipe {}", id);
                stats.recipes += 1;
            }
            Err(e) => {
                warn!("Skipping recipe {}: {}", id, e);
                stats.errors += 1;
            }
        }
    }

    for raw in &book.raw {
        let key = ensure_item(catalog, keys, raw, stats);
        catalog.mark_raw(&key)?;
    }

    for (item, recipe_id) in &book.defaults {
        match library.set_default(&keys.canonical_key(item), recipe_id) {
            Ok(()) => stats.defaults += 1,
            Err(e) => warn!("Ignoring default for '{}': {}", item, e),
        }
    }

    Ok(())
}

/// Find all recipe book files below a directory, sorted by path
pub fn find_recipe_books(dir: &Path) -> Vec<std::path::PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

/// Import every recipe book found below `dir`
pub fn import_recipe_dir(
    dir: &Path,
    catalog: &mut ItemCatalog,
    library: &mut RecipeLibrary,
) -> Result<ImportStats> {
    let keys = ItemKeys::new()?;
    let mut stats = ImportStats::default();

    let files = find_recipe_books(dir);
    info!("Found {} recipe books under {}", files.len(), dir.display());

    for path in &files {
        let result = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| import_recipe_book(&content, &keys, catalog, library, &mut stats));
        match result {
            Ok(()) => stats.files += 1,
            Err(e) => {
                warn!("Error importing {}: {:#}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

/// Write a plan as pretty-printed JSON
pub fn write_plan_file(path: &Path, plan: &Plan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Read a plan written by [`write_plan_file`]
pub fn read_plan_file(path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str::<Plan>(&content)
        .with_context(|| format!("{} is not a saved plan", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minecraft:iron_ingot", "minecraft_iron_ingot")]
    #[case("[Iron Ingot](minecraft:iron_ingot)", "minecraft_iron_ingot")]
    #[case("  Steel Plate ", "steel_plate")]
    #[case("gregtech:meta_item_1:32600", "gregtech_meta_item_1_32600")]
    #[case(":::", "item")]
    fn test_canonical_key(#[case] raw: &str, #[case] expected: &str) {
        let keys = ItemKeys::new().unwrap();
        assert_eq!(keys.canonical_key(raw), expected);
    }

    #[rstest]
    #[case("minecraft:iron_ingot", "Iron Ingot")]
    #[case("[Basic Circuit](gregtech:circuit)", "Basic Circuit")]
    #[case("water_mb", "Water (mB)")]
    #[case("gregtech:STEEL_plate", "Steel Plate")]
    fn test_display_for(#[case] raw: &str, #[case] expected: &str) {
        let keys = ItemKeys::new().unwrap();
        assert_eq!(keys.display_for(raw), expected);
    }

    #[rstest]
    #[case(Decimal::from(5), Some(100))]
    #[case(Decimal::new(502, 2), Some(101))]
    #[case(Decimal::new(15, 2), Some(3))]
    #[case(Decimal::new(1, 2), Some(1))]
    #[case(Decimal::ZERO, None)]
    fn test_seconds_to_ticks(#[case] seconds: Decimal, #[case] expected: Option<u64>) {
        assert_eq!(seconds_to_ticks(seconds), expected);
    }

    #[test]
    fn test_parse_item_list() {
        let keys = ItemKeys::new().unwrap();
        let content = "REGISTRY_NAME,DISPLAY_NAME\n\
                       minecraft:iron_ingot,Iron Ingot\n\
                       # comment\n\
                       \n\
                       [Copper Wire](gregtech:wire_copper)\n\
                       gregtech:steel_dust\n";
        let items = parse_item_list(content, &keys);
        let pairs: Vec<_> = items
            .iter()
            .map(|i| (i.id.as_str(), i.display.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("minecraft_iron_ingot", "Iron Ingot"),
                ("gregtech_wire_copper", "Copper Wire"),
                ("gregtech_steel_dust", "Steel Dust"),
            ]
        );
    }

    const BOOK: &str = r#"{
        "raw": ["minecraft:iron_ore"],
        "recipes": [
            {
                "id": "macerate_iron",
                "machine": "Macerator",
                "time_s": 5.0,
                "inputs": {"minecraft:iron_ore": 1},
                "outputs": {"gregtech:iron_dust": 2, "gregtech:stone_dust": 0.5},
                "base_eut": 2
            },
            {
                "machine": "Electric Furnace",
                "duration_ticks": 128,
                "inputs": {"gregtech:iron_dust": 1},
                "outputs": {"minecraft:iron_ingot": 1},
                "base_eut": "4",
                "base_tier": "lv",
                "gt_recipe": false
            },
            {
                "id": "broken",
                "machine": "Mixer",
                "time_s": 1,
                "outputs": {"x": 1},
                "base_eut": "lots"
            }
        ],
        "active_by_output": {"minecraft:iron_ingot": "minecraft_iron_ingot"}
    }"#;

    #[test]
    fn test_import_recipe_book() {
        let keys = ItemKeys::new().unwrap();
        let mut catalog = ItemCatalog::new();
        let mut library = RecipeLibrary::new();
        let mut stats = ImportStats::default();
        import_recipe_book(BOOK, &keys, &mut catalog, &mut library, &mut stats).unwrap();

        assert_eq!(stats.recipes, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.defaults, 1);
        assert!(catalog.is_raw("minecraft_iron_ore"));
        assert_eq!(catalog.display("gregtech_iron_dust"), "Iron Dust");

        let macerate = library.get("macerate_iron").unwrap();
        assert_eq!(macerate.duration_ticks, 100);
        assert_eq!(macerate.base_tier, Tier::ULV);
        assert_eq!(macerate.outputs[0].item, "gregtech_iron_dust");
        assert_eq!(macerate.outputs[1].quantity, Decimal::new(5, 1));

        let smelt = library.select("minecraft_iron_ingot").unwrap();
        assert_eq!(smelt.id, "minecraft_iron_ingot");
        assert_eq!(smelt.base_tier, Tier::LV);
        assert!(!smelt.overclockable);
    }

    #[test]
    fn test_import_recipe_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("iron.json"), BOOK).unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut catalog = ItemCatalog::new();
        let mut library = RecipeLibrary::new();
        let stats = import_recipe_dir(dir.path(), &mut catalog, &mut library).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.recipes, 2);
        // One broken recipe plus one unparsable file
        assert_eq!(stats.errors, 2);
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_plan_file_round_trip() {
        use crate::models::TierOverrides;
        use crate::planner::Planner;
        use crate::sample::sample_library;
        use crate::summary::{format_plan, summarize};

        let (catalog, library) = sample_library().unwrap();
        let plan = Planner::new(&catalog, &library)
            .resolve("copper_cable", Decimal::from(2), Tier::LV, &TierOverrides::new())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cable.json");
        write_plan_file(&path, &plan).unwrap();
        let loaded = read_plan_file(&path).unwrap();

        assert_eq!(loaded, plan);
        assert_eq!(format_plan(&loaded.root, 0), format_plan(&plan.root, 0));
        assert!(summarize(&loaded).to_string().contains("Assembler [LV]"));
    }

    #[test]
    fn test_read_plan_file_rejects_other_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(&path, BOOK).unwrap();
        assert!(read_plan_file(&path).is_err());
        assert!(read_plan_file(&dir.path().join("missing.json")).is_err());
    }
}
