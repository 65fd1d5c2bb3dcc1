//! Aggregation and text rendering of resolved plans

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::models::{Plan, PlanNode};
use crate::tier::Tier;

/// Total EU/t drawn by every machine in the plan.
pub fn total_energy(plan: &Plan) -> Decimal {
    plan.nodes()
        .map(PlanNode::total_eut)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Number of machines of the given type across the whole plan, all tiers.
pub fn total_machines(plan: &Plan, machine: &str) -> u64 {
    plan.nodes()
        .filter(|n| n.machine.as_deref() == Some(machine))
        .map(|n| n.machine_count)
        .sum()
}

/// Machines of one type running at one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineTotals {
    pub machine: String,
    pub tier: Tier,
    pub count: u64,
    pub eut: Decimal,
}

/// Condensed view of a plan
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub target_item: String,
    pub target_rate: Decimal,
    pub default_tier: Tier,
    pub total_eut: Decimal,
    pub machines: Vec<MachineTotals>,
    pub raw_inputs: Vec<(String, Decimal)>,
    pub unresolved: Vec<(String, String)>,
    pub warnings: Vec<(String, String)>,
}

/// Machine counts and EU/t grouped by machine type and tier, sorted by key.
pub fn machine_summary(plan: &Plan) -> Vec<MachineTotals> {
    let mut machines: BTreeMap<(String, Tier), (u64, Decimal)> = BTreeMap::new();
    for node in plan.nodes().filter(|n| n.machine_count > 0) {
        if let Some(machine) = &node.machine {
            let entry = machines
                .entry((machine.clone(), node.tier))
                .or_insert((0, Decimal::ZERO));
            entry.0 += node.machine_count;
            entry.1 = entry.1.saturating_add(node.total_eut());
        }
    }
    machines
        .into_iter()
        .map(|((machine, tier), (count, eut))| MachineTotals {
            machine,
            tier,
            count,
            eut,
        })
        .collect()
}

/// Total demand per raw resource across all branches.
pub fn raw_inputs(plan: &Plan) -> Vec<(String, Decimal)> {
    let mut raw: BTreeMap<String, Decimal> = BTreeMap::new();
    for node in plan.nodes().filter(|n| n.is_raw()) {
        *raw.entry(node.item.clone()).or_default() += node.requested_rate;
    }
    raw.into_iter().collect()
}

/// Generate a summary of the production chain
pub fn summarize(plan: &Plan) -> PlanSummary {
    PlanSummary {
        target_item: plan.target_item.clone(),
        target_rate: plan.target_rate,
        default_tier: plan.default_tier,
        total_eut: total_energy(plan),
        machines: machine_summary(plan),
        raw_inputs: raw_inputs(plan),
        unresolved: plan
            .failures()
            .into_iter()
            .map(|(item, err)| (item.to_string(), err.to_string()))
            .collect(),
        warnings: plan
            .warnings()
            .into_iter()
            .map(|(item, err)| (item.to_string(), err.to_string()))
            .collect(),
    }
}

/// Format a production chain as a readable string
pub fn format_plan(node: &PlanNode, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    if let Some(failure) = &node.failure {
        output.push_str(&format!(
            "{}! {} @ {}/s (unresolved: {})\n",
            prefix,
            node.display,
            node.requested_rate.normalize(),
            failure
        ));
        return output;
    }

    let Some(machine) = &node.machine else {
        output.push_str(&format!(
            "{}→ {} @ {}/s (raw input)\n",
            prefix,
            node.display,
            node.requested_rate.round_dp(4).normalize()
        ));
        return output;
    };

    output.push_str(&format!(
        "{}{}x {} [{}] -> {} @ {}/s ({:.2}s/op, {} OC, {} EU/t each)\n",
        prefix,
        node.machine_count,
        machine,
        node.tier,
        node.display,
        node.realized_rate.round_dp(4).normalize(),
        node.seconds_per_run(),
        node.overclocks,
        node.eut.normalize()
    ));
    for warning in &node.warnings {
        output.push_str(&format!("{}  warning: {}\n", prefix, warning));
    }
    for byproduct in &node.byproducts {
        output.push_str(&format!(
            "{}  also makes {} @ {}/s\n",
            prefix,
            byproduct.item,
            byproduct.rate.round_dp(4).normalize()
        ));
    }
    for child in &node.children {
        output.push_str(&format_plan(child, indent + 1));
    }

    output
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(
            f,
            "Target: {} @ {}/s ({} default)",
            self.target_item,
            self.target_rate.normalize(),
            self.default_tier
        )?;
        writeln!(f)?;

        writeln!(f, "Machines required:")?;
        if self.machines.is_empty() {
            writeln!(f, "  (none; target treated as raw input)")?;
        }
        for m in &self.machines {
            writeln!(
                f,
                "  {}x {} [{}] ~{} EU/t",
                m.count,
                m.machine,
                m.tier,
                m.eut.normalize()
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (item, rate) in &self.raw_inputs {
            writeln!(f, "  {} @ {}/s", item, rate.round_dp(4).normalize())?;
        }
        writeln!(f)?;

        if !self.unresolved.is_empty() {
            writeln!(f, "Unresolved:")?;
            for (item, reason) in &self.unresolved {
                writeln!(f, "  {}: {}", item, reason)?;
            }
            writeln!(f)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "Warnings:")?;
            for (item, warning) in &self.warnings {
                writeln!(f, "  {}: {}", item, warning)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Power: {} EU/t", self.total_eut.normalize())?;

        Ok(())
    }
}
