//! Voltage tiers and overclocking arithmetic

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Game ticks per second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Machine voltage tier, ordered from lowest to highest.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    ULV,
    LV,
    MV,
    HV,
    EV,
    IV,
    LuV,
    ZPM,
    UV,
    UHV,
    UEV,
}

impl Tier {
    pub const ALL: [Tier; 11] = [
        Tier::ULV,
        Tier::LV,
        Tier::MV,
        Tier::HV,
        Tier::EV,
        Tier::IV,
        Tier::LuV,
        Tier::ZPM,
        Tier::UV,
        Tier::UHV,
        Tier::UEV,
    ];

    /// Position in the tier sequence (ULV = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Maximum EU/t per amp at this tier: 8 * 4^index.
    pub fn voltage(self) -> u64 {
        8u64 << (2 * self.index())
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::ULV => "ULV",
            Tier::LV => "LV",
            Tier::MV => "MV",
            Tier::HV => "HV",
            Tier::EV => "EV",
            Tier::IV => "IV",
            Tier::LuV => "LuV",
            Tier::ZPM => "ZPM",
            Tier::UV => "UV",
            Tier::UHV => "UHV",
            Tier::UEV => "UEV",
        }
    }

    /// Lowest tier able to power a recipe drawing `eut`.
    pub fn for_eut(eut: Decimal) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|tier| Decimal::from(tier.voltage()) >= eut)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlanError::UnknownTier(s.to_string()))
    }
}

/// Number of overclocks applied when a recipe with `base` tier runs on an `effective` machine.
pub fn tiers_above(base: Tier, effective: Tier) -> Result<u32> {
    if effective < base {
        return Err(PlanError::TierBelowBase { base, effective });
    }
    Ok((effective.index() - base.index()) as u32)
}

/// Duration in ticks after `level` overclocks; each level halves it.
///
/// Returns the clamped duration and whether the halving reached zero.
pub fn overclocked_ticks(base_ticks: u64, level: u32) -> (u64, bool) {
    let ticks = base_ticks.checked_shr(level).unwrap_or(0);
    if ticks == 0 { (1, true) } else { (ticks, false) }
}

/// Per-machine EU/t after `level` overclocks; each level quadruples it.
///
/// `None` when the result does not fit a `Decimal`.
pub fn overclocked_eut(base_eut: Decimal, level: u32) -> Option<Decimal> {
    base_eut.checked_mul(Decimal::from(4u64.checked_pow(level)?))
}

/// Outcome of running a recipe on a specific tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overclock {
    pub level: u32,
    pub ticks: u64,
    pub eut: Decimal,
    /// Set when the duration had to be clamped to a single tick.
    pub underflow: bool,
}

impl Overclock {
    pub fn compute(base_ticks: u64, base_eut: Decimal, base: Tier, effective: Tier) -> Result<Self> {
        let level = tiers_above(base, effective)?;
        let (ticks, underflow) = overclocked_ticks(base_ticks, level);
        let eut = overclocked_eut(base_eut, level)
            .ok_or(PlanError::EnergyOverflow { base_eut, level })?;
        Ok(Self {
            level,
            ticks,
            eut,
            underflow,
        })
    }

    /// Recipe run at its base duration and energy.
    pub fn none(base_ticks: u64, base_eut: Decimal) -> Self {
        Self {
            level: 0,
            ticks: base_ticks.max(1),
            eut: base_eut,
            underflow: false,
        }
    }

    pub fn seconds(&self) -> Decimal {
        Decimal::from(self.ticks) / Decimal::from(TICKS_PER_SECOND)
    }

    pub fn warning(&self, base_ticks: u64) -> Option<PlanError> {
        self.underflow.then_some(PlanError::DurationUnderflow {
            base_ticks,
            level: self.level,
        })
    }
}
