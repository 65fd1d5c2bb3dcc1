//! # Nomi Planner
//!
//! Production chain planner for GregTech-style modpacks.
//!
//! Given an item catalog, a recipe library, a target item and rate, and a default
//! machine voltage tier, the planner recursively picks a recipe for every
//! intermediate item, applies the overclocking rules for the tier each machine runs
//! at, and sizes machine counts so every step keeps up with its consumers.
//!
//! ## Modules
//!
//! - [`tier`] - voltage tiers and overclock arithmetic
//! - [`catalog`] / [`library`] - known items and the recipes producing them
//! - [`planner`] - plan resolution
//! - [`summary`] - energy and machine totals, text rendering
//! - [`db`] / [`import`] - SQLite storage and file import used by the CLI
//!
//! ## Example
//!
//! ```
//! use nomi_planner::catalog::ItemCatalog;
//! use nomi_planner::library::RecipeLibrary;
//! use nomi_planner::models::{Item, Recipe, TierOverrides};
//! use nomi_planner::planner::Planner;
//! use nomi_planner::tier::Tier;
//! use rust_decimal::Decimal;
//!
//! let catalog: ItemCatalog = [Item::raw("ore", "Ore"), Item::new("dust", "Dust")]
//!     .into_iter()
//!     .collect();
//! let mut library = RecipeLibrary::new();
//! library
//!     .insert(
//!         Recipe::new("crush", "Macerator", 400, Decimal::from(2), Tier::ULV)
//!             .input("ore", 1)
//!             .output("dust", 1),
//!         &catalog,
//!     )
//!     .unwrap();
//!
//! let plan = Planner::new(&catalog, &library)
//!     .resolve("dust", Decimal::from(3), Tier::LV, &TierOverrides::new())
//!     .unwrap();
//! assert_eq!(plan.root.overclocks, 1);
//! assert_eq!(plan.root.machine_count, 30);
//! ```

pub mod catalog;
pub mod db;
pub mod error;
pub mod import;
pub mod library;
pub mod models;
pub mod planner;
pub mod sample;
pub mod summary;
pub mod tier;

pub use error::PlanError;
