//! Nomi Planner
//!
//! Production chain planner for GregTech-style modpacks.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use nomi_planner::db;
use nomi_planner::import::{self, ItemKeys};
use nomi_planner::models::TierOverrides;
use nomi_planner::planner::{DEFAULT_MAX_DEPTH, Planner};
use nomi_planner::sample;
use nomi_planner::summary;
use nomi_planner::tier::{Overclock, Tier};

#[derive(Parser)]
#[command(name = "nomi-planner")]
#[command(about = "Production chain planner for GregTech-style modpacks")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "nomi_planner.db", env = "NOMI_PLANNER_DB")]
    database: PathBuf,

    /// Log each resolution step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without a recipe dump)
    LoadSample,

    /// Import an item list (one id per line, `registry,display`, or `[Display](registry)`)
    ImportItems {
        file: PathBuf,

        /// Mark every imported item as a raw resource
        #[arg(long)]
        raw: bool,
    },

    /// Import recipe book JSON files found below a directory
    ImportRecipes {
        dir: PathBuf,

        /// Clear existing items and recipes first
        #[arg(long)]
        clear: bool,
    },

    /// Calculate the production chain for a target item
    Plan {
        /// Target item id (e.g. "basic_circuit")
        item: String,

        /// Target production rate in items per second
        #[arg(short, long, default_value = "1")]
        rate: Decimal,

        /// Default machine voltage tier (the sample steel step needs at least MV)
        #[arg(short, long, default_value_t = DEFAULT_TIER, env = "NOMI_PLANNER_TIER")]
        tier: Tier,

        /// Force a tier for one item, e.g. `--override steel_plate=HV`
        #[arg(short = 'o', long = "override", value_parser = parse_override)]
        overrides: Vec<(String, Tier)>,

        /// Show detailed production tree
        #[arg(long)]
        tree: bool,

        /// Write the plan as JSON
        #[arg(long)]
        export: Option<PathBuf>,

        /// Recursion bound guarding against recipe cycles
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Do not record the plan in history
        #[arg(long)]
        no_history: bool,
    },

    /// List recipes, optionally only those producing an item
    Recipes { item: Option<String> },

    /// List all known items
    Items,

    /// Show details and per-tier overclocks for a recipe
    Recipe { id: String },

    /// Choose the recipe used for an item
    SetDefault { item: String, recipe: String },

    /// Mark an item as a raw resource
    MarkRaw { item: String },

    /// Print a plan saved with `plan --export`
    Show { file: PathBuf },

    /// Show recently computed plans
    History {
        /// Print the stored plan with this id
        id: Option<i64>,

        #[arg(short, long, default_value_t = db::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
}

/// Lowest tier every built-in sample recipe runs at.
const DEFAULT_TIER: Tier = Tier::MV;

fn parse_override(s: &str) -> Result<(String, Tier), String> {
    let (item, tier) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=TIER, got '{}'", s))?;
    let tier = tier.parse::<Tier>().map_err(|e| e.to_string())?;
    Ok((item.trim().to_string(), tier))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let (catalog, library) = sample::sample_library()?;
            db::clear_library(&conn)?;
            db::store_library(&conn, &catalog, &library)?;
            println!(
                "Loaded {} sample recipes for {} items",
                library.len(),
                catalog.len()
            );
        }

        Commands::ImportItems { file, raw } => {
            let keys = ItemKeys::new()?;
            let items = import::load_item_list(&file, &keys)?;
            let existing = db::load_catalog(&conn)?;
            for mut item in items.iter().cloned() {
                item.raw = raw || existing.is_raw(&item.id);
                db::upsert_item(&conn, &item)?;
            }
            println!("Imported {} items from {}", items.len(), file.display());
        }

        Commands::ImportRecipes { dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_library(&conn)?;
            }
            let mut catalog = db::load_catalog(&conn)?;
            let mut library = db::load_library(&conn, &catalog)?;
            let stats = import::import_recipe_dir(&dir, &mut catalog, &mut library)?;
            db::store_library(&conn, &catalog, &library)?;
            println!("{}", stats);
        }

        Commands::Plan {
            item,
            rate,
            tier,
            overrides,
            tree,
            export,
            max_depth,
            no_history,
        } => {
            let catalog = db::load_catalog(&conn)?;
            let library = db::load_library(&conn, &catalog)?;
            let keys = ItemKeys::new()?;
            let resolve_key = |raw: String| {
                if catalog.contains(&raw) {
                    raw
                } else {
                    keys.canonical_key(&raw)
                }
            };

            let item = resolve_key(item);
            let overrides: TierOverrides = overrides
                .into_iter()
                .map(|(item, tier)| (resolve_key(item), tier))
                .collect();

            let plan = Planner::new(&catalog, &library)
                .with_max_depth(max_depth)
                .resolve(&item, rate, tier, &overrides)?;

            if tree {
                println!("Production chain:\n");
                println!("{}", summary::format_plan(&plan.root, 0));
            }
            println!("{}", summary::summarize(&plan));

            if let Some(path) = export {
                import::write_plan_file(&path, &plan)?;
                println!("Plan written to {}", path.display());
            }
            if !no_history {
                db::record_plan(&conn, &plan, db::DEFAULT_HISTORY_LIMIT)?;
            }
        }

        Commands::Recipes { item } => {
            let recipes = db::list_recipes(&conn)?;
            let recipes: Vec<_> = recipes
                .into_iter()
                .filter(|r| item.as_deref().is_none_or(|item| r.produces(item)))
                .collect();
            if recipes.is_empty() {
                println!("No recipes found. Run 'import-recipes' or 'load-sample' first.");
            } else {
                println!(
                    "{:<28} {:<24} {:>8} {:>8} {:>5}",
                    "Recipe", "Machine", "Ticks", "EU/t", "Tier"
                );
                println!("{}", "-".repeat(77));
                for r in recipes {
                    println!(
                        "{:<28} {:<24} {:>8} {:>8} {:>5}",
                        r.id,
                        r.machine,
                        r.duration_ticks,
                        r.base_eut.normalize(),
                        r.base_tier
                    );
                }
            }
        }

        Commands::Items => {
            let catalog = db::load_catalog(&conn)?;
            if catalog.is_empty() {
                println!("No items in database. Run 'import-items' or 'load-sample' first.");
            } else {
                for item in catalog.iter() {
                    let marker = if item.raw { " (raw)" } else { "" };
                    println!("  {:<32} {}{}", item.id, item.display, marker);
                }
            }
        }

        Commands::Recipe { id } => {
            let recipes = db::list_recipes(&conn)?;
            let Some(r) = recipes.iter().find(|r| r.id == id) else {
                bail!("Recipe '{}' not found", id);
            };
            println!("Recipe: {}", r.id);
            println!("  Machine: {}", r.machine);
            println!(
                "  Base: {} ticks, {} EU/t at {}",
                r.duration_ticks,
                r.base_eut.normalize(),
                r.base_tier
            );
            if let Some(notes) = &r.notes {
                println!("  Notes: {}", notes);
            }
            if !r.inputs.is_empty() {
                println!("  Inputs:");
                for s in &r.inputs {
                    println!("    {} x{}", s.item, s.quantity.normalize());
                }
            }
            println!("  Outputs:");
            for s in &r.outputs {
                println!("    {} x{}", s.item, s.quantity.normalize());
            }

            if r.overclockable {
                println!("  Overclocks:");
                for tier in Tier::ALL.into_iter().filter(|t| *t >= r.base_tier) {
                    let oc = Overclock::compute(r.duration_ticks, r.base_eut, r.base_tier, tier)?;
                    let clamp = if oc.underflow { " (clamped)" } else { "" };
                    println!(
                        "    {:<4} {:>2} OC  {:>8} ticks  {:>12} EU/t{}",
                        tier,
                        oc.level,
                        oc.ticks,
                        oc.eut.normalize(),
                        clamp
                    );
                }
            } else {
                println!("  Does not overclock");
            }
        }

        Commands::SetDefault { item, recipe } => {
            let catalog = db::load_catalog(&conn)?;
            let mut library = db::load_library(&conn, &catalog)?;
            library.set_default(&item, &recipe)?;
            db::set_default_recipe(&conn, &item, &recipe)?;
            println!("Default recipe for {} is now {}", item, recipe);
        }

        Commands::MarkRaw { item } => {
            db::set_raw(&conn, &item, true)?;
            println!("{} is now a raw resource", item);
        }

        Commands::Show { file } => {
            let plan = import::read_plan_file(&file)?;
            println!("{}", summary::format_plan(&plan.root, 0));
            println!("{}", summary::summarize(&plan));
        }

        Commands::History { id: Some(id), .. } => {
            let plan = db::load_plan(&conn, id)?;
            println!("{}", summary::format_plan(&plan.root, 0));
            println!("{}", summary::summarize(&plan));
        }

        Commands::History { id: None, limit } => {
            let records = db::recent_plans(&conn, limit)?;
            if records.is_empty() {
                println!("No plans recorded yet.");
            }
            for r in records {
                println!(
                    "{:>5}  {}  {} @ {}/s [{}]",
                    r.id,
                    r.created_at.format("%Y-%m-%d %H:%M:%S"),
                    r.target_item,
                    r.target_rate.normalize(),
                    r.default_tier
                );
            }
        }
    }

    Ok(())
}
