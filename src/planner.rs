//! Production chain resolution
//!
//! Walks the recipe graph depth-first from a target item, choosing one recipe per
//! item, applying the tier overclock rules and sizing machine counts so that each
//! node produces at least what its parent demands.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

use crate::catalog::ItemCatalog;
use crate::error::{PlanError, Result};
use crate::library::RecipeLibrary;
use crate::models::{Flow, Plan, PlanNode, TierOverrides};
use crate::tier::{Overclock, TICKS_PER_SECOND, Tier, tiers_above};

/// Recursion bound used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Resolves plans against a read-only catalog and recipe library.
pub struct Planner<'a> {
    catalog: &'a ItemCatalog,
    library: &'a RecipeLibrary,
    max_depth: usize,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a ItemCatalog, library: &'a RecipeLibrary) -> Self {
        Self {
            catalog,
            library,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Build the plan producing `target_rate` items/s of `target_item`.
    ///
    /// Unknown targets, negative rates and tiers below a recipe's base tier abort the
    /// whole resolution. Missing recipes and exceeded depth are recorded on the
    /// affected node and the rest of the tree is still resolved.
    pub fn resolve(
        &self,
        target_item: &str,
        target_rate: Decimal,
        default_tier: Tier,
        overrides: &TierOverrides,
    ) -> Result<Plan> {
        if !self.catalog.contains(target_item) {
            return Err(PlanError::UnknownItem(target_item.to_string()));
        }
        if target_rate < Decimal::ZERO {
            return Err(PlanError::InvalidRate(target_rate));
        }
        for item in overrides.keys().filter(|item| !self.catalog.contains(item)) {
            warn!("Tier override for unknown item '{}' has no effect", item);
        }

        let root = self.resolve_node(
            target_item,
            Demand::per_second(target_rate),
            default_tier,
            overrides,
            0,
        )?;

        let plan = Plan {
            target_item: target_item.to_string(),
            target_rate,
            default_tier,
            overrides: overrides.clone(),
            created_at: Utc::now(),
            root,
        };
        info!(
            "Resolved {} @ {}/s at {}: {} nodes, {} failures",
            target_item,
            target_rate,
            default_tier,
            plan.root.node_count(),
            plan.failures().len()
        );
        Ok(plan)
    }

    fn resolve_node(
        &self,
        item: &str,
        demand: Demand,
        default_tier: Tier,
        overrides: &TierOverrides,
        depth: usize,
    ) -> Result<PlanNode> {
        let tier = overrides.get(item).copied().unwrap_or(default_tier);
        let display = self.catalog.display(item);
        let rate = demand.rate()?;

        if self.catalog.is_raw(item) {
            return Ok(PlanNode::leaf(item, display, rate, tier));
        }

        if depth > self.max_depth {
            warn!(
                "Depth {} exceeded at '{}' - possible cycle in production chain",
                self.max_depth, item
            );
            let mut node = PlanNode::leaf(item, display, rate, tier);
            node.failure = Some(PlanError::CycleDepthExceeded {
                item: item.to_string(),
                max_depth: self.max_depth,
            });
            return Ok(node);
        }

        let recipe = match self.library.select(item) {
            Ok(recipe) => recipe,
            Err(err) => {
                warn!("Unresolved branch: {}", err);
                let mut node = PlanNode::leaf(item, display, rate, tier);
                node.failure = Some(err);
                return Ok(node);
            }
        };
        let Some(out_qty) = recipe.output_quantity(item) else {
            return Err(PlanError::InvalidRecipe {
                id: recipe.id.clone(),
                reason: format!("does not produce '{}'", item),
            });
        };

        let oc = if recipe.overclockable {
            Overclock::compute(recipe.duration_ticks, recipe.base_eut, recipe.base_tier, tier)?
        } else {
            tiers_above(recipe.base_tier, tier)?;
            Overclock::none(recipe.duration_ticks, recipe.base_eut)
        };

        let mut node = PlanNode::leaf(item, display, rate, tier);
        node.recipe_id = Some(recipe.id.clone());
        node.machine = Some(recipe.machine.clone());
        node.overclocks = oc.level;
        node.duration_ticks = oc.ticks;
        node.eut = oc.eut;
        if let Some(warning) = oc.warning(recipe.duration_ticks) {
            warn!("{} ({})", warning, item);
            node.warnings.push(warning);
        }

        let machines = demand
            .machines(out_qty, oc.ticks)
            .ok_or(PlanError::InvalidRate(rate))?;
        node.machine_count = machines;
        node.realized_rate = Demand::produced(out_qty, machines, oc.ticks)
            .and_then(|d| d.rate().ok())
            .ok_or(PlanError::InvalidRate(rate))?;
        if oc.eut.checked_mul(Decimal::from(machines)).is_none() {
            return Err(PlanError::EnergyOverflow {
                base_eut: recipe.base_eut,
                level: oc.level,
            });
        }

        debug!(
            "{}{} x{} [{}] {} -> {}/s (requested {}/s)",
            "  ".repeat(depth),
            recipe.machine,
            machines,
            tier,
            item,
            node.realized_rate,
            rate
        );

        if machines == 0 {
            return Ok(node);
        }

        for byproduct in recipe.outputs.iter().filter(|s| s.item != item) {
            let byproduct_rate = flow_rate(byproduct.quantity, machines, oc.ticks)
                .ok_or(PlanError::InvalidRate(rate))?;
            node.byproducts.push(Flow {
                item: byproduct.item.clone(),
                rate: byproduct_rate,
            });
        }

        for input in &recipe.inputs {
            let child = Demand::produced(input.quantity, machines, oc.ticks)
                .ok_or(PlanError::InvalidRate(rate))?;
            node.inputs.push(Flow {
                item: input.item.clone(),
                rate: child.rate()?,
            });
            node.children.push(self.resolve_node(
                &input.item,
                child,
                default_tier,
                overrides,
                depth + 1,
            )?);
        }

        Ok(node)
    }
}

/// Demand in items/s held as the exact ratio `amount / per`.
///
/// Child demand is `qty * machines * 20 / ticks`; dividing early would round it and the
/// next ceiling could add a machine nobody needs.
#[derive(Debug, Clone, Copy)]
struct Demand {
    amount: Decimal,
    per: u64,
}

impl Demand {
    fn per_second(rate: Decimal) -> Self {
        Self {
            amount: rate,
            per: 1,
        }
    }

    /// Output of `machines` machines each making `qty` per `ticks`-long run.
    fn produced(qty: Decimal, machines: u64, ticks: u64) -> Option<Self> {
        let amount = qty
            .checked_mul(Decimal::from(machines))?
            .checked_mul(Decimal::from(TICKS_PER_SECOND))?;
        Some(Self { amount, per: ticks })
    }

    fn rate(&self) -> Result<Decimal> {
        self.amount
            .checked_div(Decimal::from(self.per))
            .ok_or(PlanError::InvalidRate(self.amount))
    }

    /// Smallest machine count covering this demand, compared on exact products.
    fn machines(&self, out_qty: Decimal, ticks: u64) -> Option<u64> {
        if self.amount <= Decimal::ZERO {
            return Some(0);
        }
        let needed = self.amount.checked_mul(Decimal::from(ticks))?;
        let each = out_qty
            .checked_mul(Decimal::from(TICKS_PER_SECOND))?
            .checked_mul(Decimal::from(self.per))?;

        let mut count = needed.checked_div(each)?.ceil();
        // The quotient is rounded to 28 digits; settle on the true ceiling
        if count.checked_mul(each)? < needed {
            count += Decimal::ONE;
        } else if count > Decimal::ZERO && (count - Decimal::ONE).checked_mul(each)? >= needed {
            count -= Decimal::ONE;
        }
        count.to_u64()
    }
}

/// Smallest machine count whose combined output covers `rate`.
///
/// `None` when the count does not fit the arithmetic.
pub fn machines_needed(rate: Decimal, out_qty: Decimal, ticks: u64) -> Option<u64> {
    Demand::per_second(rate).machines(out_qty, ticks)
}

/// Items/s moved by `machines` machines each handling `qty` per `ticks`-long run.
pub fn flow_rate(qty: Decimal, machines: u64, ticks: u64) -> Option<Decimal> {
    Demand::produced(qty, machines, ticks)?.rate().ok()
}
