//! Built-in sample data for trying the planner without a recipe dump

use rust_decimal::Decimal;

use crate::catalog::ItemCatalog;
use crate::error::Result;
use crate::library::RecipeLibrary;
use crate::models::{Item, Recipe};
use crate::tier::Tier;

/// Early-game circuit chain: ores and rubber in, basic circuits out.
pub fn sample_library() -> Result<(ItemCatalog, RecipeLibrary)> {
    let catalog: ItemCatalog = [
        Item::raw("iron_ore", "Iron Ore"),
        Item::raw("copper_ingot", "Copper Ingot"),
        Item::raw("rubber", "Rubber Sheet"),
        Item::raw("oxygen", "Oxygen (mB)"),
        Item::new("iron_dust", "Iron Dust"),
        Item::new("stone_dust", "Stone Dust"),
        Item::new("iron_ingot", "Iron Ingot"),
        Item::new("steel_ingot", "Steel Ingot"),
        Item::new("steel_plate", "Steel Plate"),
        Item::new("copper_wire", "1x Copper Wire"),
        Item::new("copper_cable", "1x Copper Cable"),
        Item::new("basic_circuit", "Basic Circuit"),
    ]
    .into_iter()
    .collect();

    let recipes = [
        Recipe::new("macerate_iron_ore", "Macerator", 100, Decimal::from(2), Tier::ULV)
            .input("iron_ore", 1)
            .output("iron_dust", 2)
            .output("stone_dust", 1),
        // Electric route first; the plain furnace is the fallback candidate
        Recipe::new("smelt_iron_dust", "Electric Furnace", 128, Decimal::from(4), Tier::ULV)
            .input("iron_dust", 1)
            .output("iron_ingot", 1),
        Recipe::new("furnace_iron_ore", "Furnace", 200, Decimal::ONE, Tier::ULV)
            .input("iron_ore", 1)
            .output("iron_ingot", 1)
            .not_overclockable()
            .with_notes("coal-fired, does not overclock"),
        Recipe::new("blast_steel", "Electric Blast Furnace", 1000, Decimal::from(120), Tier::MV)
            .input("iron_ingot", 1)
            .input("oxygen", 1000)
            .output("steel_ingot", 1),
        Recipe::new("bend_steel_plate", "Bender", 200, Decimal::from(24), Tier::LV)
            .input("steel_ingot", 1)
            .output("steel_plate", 1),
        Recipe::new("draw_copper_wire", "Wiremill", 100, Decimal::from(7), Tier::ULV)
            .input("copper_ingot", 1)
            .output("copper_wire", 2),
        Recipe::new("insulate_copper_cable", "Assembler", 100, Decimal::from(8), Tier::LV)
            .input("copper_wire", 1)
            .input("rubber", 1)
            .output("copper_cable", 1),
        Recipe::new("assemble_basic_circuit", "Assembler", 400, Decimal::from(16), Tier::LV)
            .input("steel_plate", 1)
            .input("copper_cable", 3)
            .output("basic_circuit", 1),
    ];

    let mut library = RecipeLibrary::new();
    for recipe in recipes {
        library.insert(recipe, &catalog)?;
    }
    Ok((catalog, library))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TierOverrides;
    use crate::planner::Planner;
    use crate::summary::total_machines;

    #[test]
    fn test_sample_resolves_completely() {
        let (catalog, library) = sample_library().unwrap();
        assert_eq!(library.len(), 8);
        assert_eq!(library.recipes_for("iron_ingot").count(), 2);

        let plan = Planner::new(&catalog, &library)
            .resolve("basic_circuit", Decimal::ONE, Tier::MV, &TierOverrides::new())
            .unwrap();
        assert!(plan.is_complete());
        assert!(plan.warnings().is_empty());
        assert!(total_machines(&plan, "Assembler") > 0);
        assert_eq!(
            plan.root.child("steel_plate").unwrap().recipe_id.as_deref(),
            Some("bend_steel_plate")
        );
    }
}
