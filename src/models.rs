//! Data models for items, recipes and resolved production plans

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::tier::{TICKS_PER_SECOND, Tier};

/// Per-item forced tier for one resolution.
pub type TierOverrides = BTreeMap<String, Tier>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub display: String,
    /// Raw resources terminate the plan tree even when a recipe exists
    pub raw: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: display.into(),
            raw: false,
        }
    }

    pub fn raw(id: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            raw: true,
            ..Self::new(id, display)
        }
    }
}

/// An item quantity consumed or produced by one recipe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub item: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub machine: String,
    pub inputs: Vec<Stack>,
    pub outputs: Vec<Stack>,
    pub duration_ticks: u64,
    /// EU/t drawn at `base_tier`
    pub base_eut: Decimal,
    pub base_tier: Tier,
    pub overclockable: bool,
    pub notes: Option<String>,
}

impl Recipe {
    pub fn new(
        id: impl Into<String>,
        machine: impl Into<String>,
        duration_ticks: u64,
        base_eut: Decimal,
        base_tier: Tier,
    ) -> Self {
        Self {
            id: id.into(),
            machine: machine.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            duration_ticks,
            base_eut,
            base_tier,
            overclockable: true,
            notes: None,
        }
    }

    pub fn input(mut self, item: impl Into<String>, quantity: impl Into<Decimal>) -> Self {
        self.inputs.push(Stack {
            item: item.into(),
            quantity: quantity.into(),
        });
        self
    }

    pub fn output(mut self, item: impl Into<String>, quantity: impl Into<Decimal>) -> Self {
        self.outputs.push(Stack {
            item: item.into(),
            quantity: quantity.into(),
        });
        self
    }

    pub fn not_overclockable(mut self) -> Self {
        self.overclockable = false;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn produces(&self, item: &str) -> bool {
        self.outputs.iter().any(|s| s.item == item)
    }

    pub fn output_quantity(&self, item: &str) -> Option<Decimal> {
        self.outputs
            .iter()
            .find(|s| s.item == item)
            .map(|s| s.quantity)
    }

    /// Every referenced item, outputs first.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .chain(self.inputs.iter())
            .map(|s| s.item.as_str())
    }

    /// Check the structural invariants of a recipe.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| PlanError::InvalidRecipe {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("recipe id is empty"));
        }
        if self.duration_ticks == 0 {
            return Err(invalid("duration must be positive"));
        }
        if self.base_eut <= Decimal::ZERO {
            return Err(invalid("base energy rate must be positive"));
        }
        if self.outputs.is_empty() {
            return Err(invalid("recipe has no outputs"));
        }
        for (label, stacks) in [("input", &self.inputs), ("output", &self.outputs)] {
            for (i, stack) in stacks.iter().enumerate() {
                if stack.quantity <= Decimal::ZERO {
                    return Err(invalid(&format!(
                        "{} '{}' has non-positive quantity",
                        label, stack.item
                    )));
                }
                if stacks[..i].iter().any(|s| s.item == stack.item) {
                    return Err(invalid(&format!("{} '{}' listed twice", label, stack.item)));
                }
            }
        }
        Ok(())
    }
}

/// An item flowing at a rate (items per second).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub item: String,
    pub rate: Decimal,
}

/// Resolved step of a production plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanNode {
    pub item: String,
    pub display: String,
    /// Rate demanded by the parent (items/s)
    pub requested_rate: Decimal,
    /// Rate actually produced by `machine_count` machines
    pub realized_rate: Decimal,
    pub recipe_id: Option<String>,
    pub machine: Option<String>,
    pub tier: Tier,
    pub overclocks: u32,
    pub duration_ticks: u64,
    /// Per-machine EU/t
    pub eut: Decimal,
    pub machine_count: u64,
    pub inputs: Vec<Flow>,
    pub byproducts: Vec<Flow>,
    pub children: Vec<PlanNode>,
    pub failure: Option<PlanError>,
    pub warnings: Vec<PlanError>,
}

impl PlanNode {
    /// Leaf with no recipe: a raw resource or a failed branch.
    pub(crate) fn leaf(item: &str, display: &str, rate: Decimal, tier: Tier) -> Self {
        Self {
            item: item.to_string(),
            display: display.to_string(),
            requested_rate: rate,
            realized_rate: rate,
            recipe_id: None,
            machine: None,
            tier,
            overclocks: 0,
            duration_ticks: 0,
            eut: Decimal::ZERO,
            machine_count: 0,
            inputs: Vec::new(),
            byproducts: Vec::new(),
            children: Vec::new(),
            failure: None,
            warnings: Vec::new(),
        }
    }

    pub fn is_raw(&self) -> bool {
        self.recipe_id.is_none() && self.failure.is_none()
    }

    /// Child node resolving the given input.
    pub fn child(&self, item: &str) -> Option<&PlanNode> {
        self.children.iter().find(|c| c.item == item)
    }

    /// Output of a single machine in items/s.
    pub fn throughput_per_machine(&self) -> Decimal {
        if self.duration_ticks == 0 || self.machine_count == 0 {
            return Decimal::ZERO;
        }
        self.realized_rate / Decimal::from(self.machine_count)
    }

    /// EU/t drawn by all machines of this node.
    pub fn total_eut(&self) -> Decimal {
        self.eut.saturating_mul(Decimal::from(self.machine_count))
    }

    pub fn seconds_per_run(&self) -> Decimal {
        Decimal::from(self.duration_ticks) / Decimal::from(TICKS_PER_SECOND)
    }

    /// Pre-order traversal of this node and its descendants.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a PlanNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A resolved production chain for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub target_item: String,
    pub target_rate: Decimal,
    pub default_tier: Tier,
    pub overrides: TierOverrides,
    pub created_at: DateTime<Utc>,
    pub root: PlanNode,
}

impl Plan {
    pub fn nodes(&self) -> PreOrder<'_> {
        self.root.iter()
    }

    /// Failure markers in pre-order, with the item they were raised on.
    pub fn failures(&self) -> Vec<(&str, &PlanError)> {
        self.nodes()
            .filter_map(|n| n.failure.as_ref().map(|f| (n.item.as_str(), f)))
            .collect()
    }

    pub fn warnings(&self) -> Vec<(&str, &PlanError)> {
        self.nodes()
            .flat_map(|n| n.warnings.iter().map(move |w| (n.item.as_str(), w)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.nodes().all(|n| n.failure.is_none())
    }
}
