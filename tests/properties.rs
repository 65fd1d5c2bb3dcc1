//! Property tests for the overclock and machine sizing arithmetic.

use nomi_planner::catalog::ItemCatalog;
use nomi_planner::library::RecipeLibrary;
use nomi_planner::models::{Item, PlanNode, Recipe, TierOverrides};
use nomi_planner::planner::{Planner, machines_needed};
use nomi_planner::tier::{Overclock, TICKS_PER_SECOND, Tier, overclocked_eut, overclocked_ticks};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal::Decimal;

fn tier() -> impl Strategy<Value = Tier> {
    prop::sample::select(Tier::ALL.to_vec())
}

fn single_step(ticks: u64, out_qty: u32, base: Tier) -> (ItemCatalog, RecipeLibrary) {
    let catalog: ItemCatalog = [Item::raw("ore", "Ore"), Item::new("dust", "Dust")]
        .into_iter()
        .collect();
    let mut library = RecipeLibrary::new();
    library
        .insert(
            Recipe::new("crush", "Macerator", ticks, Decimal::from(2), base)
                .input("ore", 1)
                .output("dust", out_qty),
            &catalog,
        )
        .unwrap();
    (catalog, library)
}

/// ore -> low -> mid -> top, each step with its own duration and quantities.
fn chain(steps: &[(u64, u32, u32); 3]) -> (ItemCatalog, RecipeLibrary) {
    let catalog: ItemCatalog = [
        Item::raw("ore", "Ore"),
        Item::new("low", "Low"),
        Item::new("mid", "Mid"),
        Item::new("top", "Top"),
    ]
    .into_iter()
    .collect();
    let mut library = RecipeLibrary::new();
    let links = [("top", "mid"), ("mid", "low"), ("low", "ore")];
    for ((output, input), &(ticks, in_qty, out_qty)) in links.into_iter().zip(steps) {
        library
            .insert(
                Recipe::new(output, "Assembler", ticks, Decimal::from(2), Tier::ULV)
                    .input(input, in_qty)
                    .output(output, out_qty),
                &catalog,
            )
            .unwrap();
    }
    (catalog, library)
}

/// Check a node's machine count against the exact demand `amount / per` items/s.
fn check_sizing(
    library: &RecipeLibrary,
    node: &PlanNode,
    amount: Decimal,
    per: u64,
) -> Result<(), TestCaseError> {
    let Some(recipe) = node.recipe_id.as_deref().and_then(|id| library.get(id)) else {
        return Ok(());
    };
    let out_qty = recipe.output_quantity(&node.item).unwrap();
    let ticks = Decimal::from(node.duration_ticks);
    let twenty = Decimal::from(TICKS_PER_SECOND);

    // machines * out_qty * 20 / ticks >= amount / per, cross-multiplied
    let needed = amount * ticks;
    let each = out_qty * twenty * Decimal::from(per);
    let machines = Decimal::from(node.machine_count);
    prop_assert!(machines * each >= needed, "{} under-provisioned", node.item);
    if node.machine_count > 0 {
        prop_assert!(
            (machines - Decimal::ONE) * each < needed,
            "{} over-provisioned",
            node.item
        );
    }
    prop_assert!(node.realized_rate >= node.requested_rate);
    if node.machine_count == 0 {
        prop_assert!(node.children.is_empty());
        return Ok(());
    }

    for input in &recipe.inputs {
        let child = node.child(&input.item).unwrap();
        let child_amount = input.quantity * machines * twenty;
        check_sizing(library, child, child_amount, node.duration_ticks)?;
    }
    Ok(())
}

proptest! {
    #[test]
    fn duration_halves_and_energy_quadruples(base_ticks in 1u64..1_000_000, base_eut in 1u32..10_000, level in 0u32..11) {
        let (ticks, underflow) = overclocked_ticks(base_ticks, level);
        let expected = base_ticks / 2u64.pow(level);
        prop_assert_eq!(ticks, expected.max(1));
        prop_assert_eq!(underflow, expected == 0);
        prop_assert_eq!(
            overclocked_eut(Decimal::from(base_eut), level),
            Some(Decimal::from(base_eut) * Decimal::from(4u64.pow(level)))
        );
    }

    #[test]
    fn overclock_level_is_tier_distance(base in tier(), effective in tier()) {
        let result = Overclock::compute(100, Decimal::from(8), base, effective);
        if effective < base {
            prop_assert!(result.is_err());
        } else {
            let oc = result.unwrap();
            prop_assert_eq!(oc.level as usize, effective.index() - base.index());
        }
    }

    #[test]
    fn machine_count_is_the_exact_ceiling(rate_milli in 1i64..1_000_000, ticks in 1u64..5_000, out_qty in 1u32..64) {
        let rate = Decimal::new(rate_milli, 3);
        let out_qty = Decimal::from(out_qty);
        // Compare items per `ticks` ticks to stay exact
        let demand = rate * Decimal::from(ticks);
        let per_machine = out_qty * Decimal::from(TICKS_PER_SECOND);

        let machines = machines_needed(rate, out_qty, ticks).unwrap();
        prop_assert!(Decimal::from(machines) * per_machine >= demand);
        prop_assert!(Decimal::from(machines - 1) * per_machine < demand);
    }

    #[test]
    fn divisible_rates_are_not_over_provisioned(machines in 1u64..500, twos in 0u32..9, fives in 0u32..5, out_qty in 1u32..16) {
        // Durations of the form 2^a * 5^b keep the rate a terminating decimal
        let ticks = 2u64.pow(twos) * 5u64.pow(fives);
        let out_qty = Decimal::from(out_qty);
        let rate = out_qty * Decimal::from(machines) * Decimal::from(TICKS_PER_SECOND) / Decimal::from(ticks);
        prop_assert_eq!(machines_needed(rate, out_qty, ticks), Some(machines));
    }

    #[test]
    fn resolved_root_covers_target(rate_milli in 0i64..200_000, ticks in 1u64..2_000, out_qty in 1u32..8, effective in tier()) {
        let (catalog, library) = single_step(ticks, out_qty, Tier::ULV);
        let rate = Decimal::new(rate_milli, 3);
        let plan = Planner::new(&catalog, &library)
            .resolve("dust", rate, effective, &TierOverrides::new())
            .unwrap();

        let root = &plan.root;
        prop_assert!(root.realized_rate >= rate);
        prop_assert_eq!(root.machine_count == 0, rate.is_zero());
        prop_assert_eq!(root.children.is_empty(), rate.is_zero());
        prop_assert_eq!(root.warnings.is_empty(), ticks >> effective.index() > 0);
    }

    #[test]
    fn every_node_gets_the_exact_ceiling(
        steps in prop::array::uniform3((1u64..200, 1u32..6, 1u32..6)),
        rate_milli in 0i64..50_000,
    ) {
        let (catalog, library) = chain(&steps);
        let rate = Decimal::new(rate_milli, 3);
        let plan = Planner::new(&catalog, &library)
            .resolve("top", rate, Tier::ULV, &TierOverrides::new())
            .unwrap();

        prop_assert!(plan.is_complete());
        check_sizing(&library, &plan.root, rate, 1)?;
    }
}
