//! End-to-end resolution tests against the public library API.

use nomi_planner::PlanError;
use nomi_planner::catalog::ItemCatalog;
use nomi_planner::library::RecipeLibrary;
use nomi_planner::models::{Item, Recipe, TierOverrides};
use nomi_planner::planner::Planner;
use nomi_planner::sample::sample_library;
use nomi_planner::summary::{raw_inputs, summarize, total_energy};
use nomi_planner::tier::Tier;
use rust_decimal::Decimal;

fn no_overrides() -> TierOverrides {
    TierOverrides::new()
}

#[test]
fn test_two_overclocks_size_fifteen_machines() {
    let catalog: ItemCatalog = [Item::raw("plate", "Plate"), Item::new("gear", "Gear")]
        .into_iter()
        .collect();
    let mut library = RecipeLibrary::new();
    library
        .insert(
            Recipe::new("press_gear", "Forming Press", 20, Decimal::from(8), Tier::LV)
                .input("plate", 1)
                .output("gear", 1),
            &catalog,
        )
        .unwrap();

    // 3 gears per tick
    let plan = Planner::new(&catalog, &library)
        .resolve("gear", Decimal::from(60), Tier::HV, &no_overrides())
        .unwrap();

    let root = &plan.root;
    assert_eq!(root.overclocks, 2);
    assert_eq!(root.duration_ticks, 5);
    assert_eq!(root.eut, Decimal::from(128));
    assert_eq!(root.throughput_per_machine(), Decimal::from(4));
    assert_eq!(root.machine_count, 15);
    assert_eq!(root.realized_rate, Decimal::from(60));
    assert_eq!(root.child("plate").unwrap().requested_rate, Decimal::from(60));
}

#[test]
fn test_cycle_stops_at_depth_bound() {
    let catalog: ItemCatalog = [Item::new("a", "A"), Item::new("b", "B")]
        .into_iter()
        .collect();
    let mut library = RecipeLibrary::new();
    library
        .insert(
            Recipe::new("a_from_b", "Mixer", 20, Decimal::from(8), Tier::LV)
                .input("b", 1)
                .output("a", 1),
            &catalog,
        )
        .unwrap();
    library
        .insert(
            Recipe::new("b_from_a", "Mixer", 20, Decimal::from(8), Tier::LV)
                .input("a", 1)
                .output("b", 1),
            &catalog,
        )
        .unwrap();

    let plan = Planner::new(&catalog, &library)
        .with_max_depth(6)
        .resolve("a", Decimal::ONE, Tier::LV, &no_overrides())
        .unwrap();

    let failures = plan.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].1,
        &PlanError::CycleDepthExceeded {
            item: failures[0].0.to_string(),
            max_depth: 6,
        }
    );
    // Depths 0..=6 resolve, the node at depth 7 carries the failure
    assert_eq!(plan.root.node_count(), 8);
    assert!(!plan.is_complete());
}

#[test]
fn test_resolution_is_idempotent() {
    let (catalog, library) = sample_library().unwrap();
    let planner = Planner::new(&catalog, &library);
    let mut overrides = no_overrides();
    overrides.insert("steel_ingot".to_string(), Tier::HV);

    let first = planner
        .resolve("basic_circuit", Decimal::new(25, 1), Tier::MV, &overrides)
        .unwrap();
    let second = planner
        .resolve("basic_circuit", Decimal::new(25, 1), Tier::MV, &overrides)
        .unwrap();

    assert_eq!(first.root, second.root);
    assert_eq!(first.root.node_count(), second.root.node_count());
    assert_eq!(total_energy(&first), total_energy(&second));
}

#[test]
fn test_selection_is_deterministic_without_default() {
    let (catalog, library) = sample_library().unwrap();
    let planner = Planner::new(&catalog, &library);

    for _ in 0..5 {
        let plan = planner
            .resolve("iron_ingot", Decimal::ONE, Tier::LV, &no_overrides())
            .unwrap();
        assert_eq!(plan.root.recipe_id.as_deref(), Some("smelt_iron_dust"));
    }
}

#[test]
fn test_default_recipe_changes_branch() {
    let (catalog, mut library) = sample_library().unwrap();
    library.set_default("iron_ingot", "furnace_iron_ore").unwrap();

    let plan = Planner::new(&catalog, &library)
        .resolve("iron_ingot", Decimal::ONE, Tier::HV, &no_overrides())
        .unwrap();
    let root = &plan.root;
    assert_eq!(root.machine.as_deref(), Some("Furnace"));
    // Coal furnaces ignore the machine tier
    assert_eq!(root.overclocks, 0);
    assert_eq!(root.duration_ticks, 200);
    assert_eq!(root.machine_count, 10);
    assert!(root.child("iron_ore").unwrap().is_raw());
}

#[test]
fn test_raw_resources_are_leaves() {
    let (catalog, library) = sample_library().unwrap();
    let plan = Planner::new(&catalog, &library)
        .resolve("basic_circuit", Decimal::ONE, Tier::EV, &no_overrides())
        .unwrap();

    for node in plan.nodes().filter(|n| catalog.is_raw(&n.item)) {
        assert!(node.children.is_empty());
        assert!(node.recipe_id.is_none());
        assert_eq!(node.machine_count, 0);
    }
    let raw: Vec<_> = raw_inputs(&plan).into_iter().map(|(item, _)| item).collect();
    assert_eq!(raw, vec!["copper_ingot", "iron_ore", "oxygen", "rubber"]);
}

#[test]
fn test_zero_rate_yields_empty_root() {
    let (catalog, library) = sample_library().unwrap();
    let plan = Planner::new(&catalog, &library)
        .resolve("steel_plate", Decimal::ZERO, Tier::LV, &no_overrides())
        .unwrap();
    assert_eq!(plan.root.machine_count, 0);
    assert!(plan.root.children.is_empty());
    assert_eq!(total_energy(&plan), Decimal::ZERO);
}

#[test]
fn test_fatal_errors_abort_resolution() {
    let (catalog, library) = sample_library().unwrap();
    let planner = Planner::new(&catalog, &library);

    assert_eq!(
        planner.resolve("diamond", Decimal::ONE, Tier::LV, &no_overrides()),
        Err(PlanError::UnknownItem("diamond".to_string()))
    );
    assert_eq!(
        planner.resolve("steel_plate", Decimal::NEGATIVE_ONE, Tier::LV, &no_overrides()),
        Err(PlanError::InvalidRate(Decimal::NEGATIVE_ONE))
    );
    // The blast furnace recipe needs MV
    assert_eq!(
        planner.resolve("steel_ingot", Decimal::ONE, Tier::LV, &no_overrides()),
        Err(PlanError::TierBelowBase {
            base: Tier::MV,
            effective: Tier::LV,
        })
    );
}

#[test]
fn test_missing_recipe_keeps_siblings() {
    let catalog: ItemCatalog = [
        Item::raw("copper", "Copper"),
        Item::new("rubber", "Rubber"),
        Item::new("wire", "Wire"),
        Item::new("cable", "Cable"),
    ]
    .into_iter()
    .collect();
    let mut library = RecipeLibrary::new();
    library
        .insert(
            Recipe::new("cable", "Assembler", 100, Decimal::from(8), Tier::LV)
                .input("wire", 1)
                .input("rubber", 1)
                .output("cable", 1),
            &catalog,
        )
        .unwrap();
    library
        .insert(
            Recipe::new("wire", "Wiremill", 100, Decimal::from(4), Tier::LV)
                .input("copper", 1)
                .output("wire", 2),
            &catalog,
        )
        .unwrap();

    let plan = Planner::new(&catalog, &library)
        .resolve("cable", Decimal::ONE, Tier::LV, &no_overrides())
        .unwrap();

    assert_eq!(
        plan.failures(),
        vec![(
            "rubber",
            &PlanError::NoRecipe {
                item: "rubber".to_string()
            }
        )]
    );
    let wire = plan.root.child("wire").unwrap();
    assert_eq!(wire.machine_count, 3);
    assert_eq!(summarize(&plan).unresolved.len(), 1);
}

#[test]
fn test_plan_exports_as_json() {
    let (catalog, library) = sample_library().unwrap();
    let plan = Planner::new(&catalog, &library)
        .resolve("copper_cable", Decimal::ONE, Tier::LV, &no_overrides())
        .unwrap();

    let json = serde_json::to_string_pretty(&plan).unwrap();
    assert!(json.contains("\"target_item\": \"copper_cable\""));
    let back: nomi_planner::models::Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(back, plan);
}
