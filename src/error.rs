//! Error types for catalog, library and plan resolution

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// Failures raised by the planning core.
///
/// Some variants abort a whole resolution (`UnknownItem`, `InvalidRate`,
/// `TierBelowBase`, `EnergyOverflow`), others are recorded on the affected [`PlanNode`]
/// (`NoRecipe`, `CycleDepthExceeded` as failures, `DurationUnderflow` as a warning).
///
/// [`PlanNode`]: crate::models::PlanNode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PlanError {
    #[error("no recipe produces '{item}' and it is not a raw resource")]
    NoRecipe { item: String },

    #[error("unknown voltage tier '{0}'")]
    UnknownTier(String),

    #[error("tier {effective} is below the recipe base tier {base}")]
    TierBelowBase { base: Tier, effective: Tier },

    #[error("duration of {base_ticks} ticks underflows after {level} overclocks; clamped to 1 tick")]
    DurationUnderflow { base_ticks: u64, level: u32 },

    #[error("maximum depth {max_depth} exceeded at '{item}' - possible cycle in production chain")]
    CycleDepthExceeded { item: String, max_depth: usize },

    #[error("{base_eut} EU/t overflows after {level} overclocks")]
    EnergyOverflow { base_eut: Decimal, level: u32 },

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("target rate must not be negative (got {0})")]
    InvalidRate(Decimal),

    #[error("invalid recipe '{id}': {reason}")]
    InvalidRecipe { id: String, reason: String },

    #[error("recipe id '{0}' already exists")]
    DuplicateRecipe(String),

    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),
}

impl PlanError {
    /// Node-local failures leave the rest of the plan intact.
    pub fn is_node_local(&self) -> bool {
        matches!(
            self,
            PlanError::NoRecipe { .. }
                | PlanError::CycleDepthExceeded { .. }
                | PlanError::DurationUnderflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
