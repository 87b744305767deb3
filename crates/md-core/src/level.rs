//! Discrete automation levels and forecast variants.

use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

// ── Level ─────────────────────────────────────────────────────────────────────

/// A discrete automation level.  Totally ordered: `L0 < L2 < L3 < L4`.
///
/// There is deliberately no `L1`; the ordering is derived from declaration
/// order so comparisons read naturally (`level > Level::L2`).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    #[default]
    L0,
    L2,
    L3,
    L4,
}

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 4] = [Level::L0, Level::L2, Level::L3, Level::L4];

    /// The levels that forecasts are reported for, in `[L2, L3, L4]` order.
    pub const FORECAST: [Level; 3] = [Level::L2, Level::L3, Level::L4];

    /// One level up, saturating at `L4`.
    #[inline]
    pub fn increment(self) -> Level {
        match self {
            Level::L0 => Level::L2,
            Level::L2 => Level::L3,
            Level::L3 | Level::L4 => Level::L4,
        }
    }

    /// One level down, saturating at `L0`.
    #[inline]
    pub fn decrement(self) -> Level {
        match self {
            Level::L0 | Level::L2 => Level::L0,
            Level::L3 => Level::L2,
            Level::L4 => Level::L3,
        }
    }

    /// Index into a 4-entry table that includes L0 (`L0 → 0 … L4 → 3`).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Level::L0 => 0,
            Level::L2 => 1,
            Level::L3 => 2,
            Level::L4 => 3,
        }
    }

    /// Index into a 3-entry forecast array (`L2 → 0, L3 → 1, L4 → 2`).
    /// `None` for `L0`, which has no forecast entry.
    #[inline]
    pub fn forecast_index(self) -> Option<usize> {
        match self {
            Level::L0 => None,
            Level::L2 => Some(0),
            Level::L3 => Some(1),
            Level::L4 => Some(2),
        }
    }

    /// `true` for the automated levels (L3 and L4) in which the driver may
    /// perform a non-driving-related task.
    #[inline]
    pub fn is_automated(self) -> bool {
        self > Level::L2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::L0 => "L0",
            Level::L2 => "L2",
            Level::L3 => "L3",
            Level::L4 => "L4",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L0" => Ok(Level::L0),
            "L2" => Ok(Level::L2),
            "L3" => Ok(Level::L3),
            "L4" => Ok(Level::L4),
            other => Err(ConfigError::UnknownLevel(other.to_owned())),
        }
    }
}

// ── Variant ───────────────────────────────────────────────────────────────────

/// Which of the three maximum-level partitions a forecast is computed on.
///
/// Every road event carries a nominal level plus an optimistic (one higher)
/// and a pessimistic (one lower) estimate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    #[default]
    Nominal,
    Optimistic,
    Pessimistic,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Nominal, Variant::Optimistic, Variant::Pessimistic];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Variant::Nominal     => 0,
            Variant::Optimistic  => 1,
            Variant::Pessimistic => 2,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Nominal     => "nominal",
            Variant::Optimistic  => "optimistic",
            Variant::Pessimistic => "pessimistic",
        })
    }
}
