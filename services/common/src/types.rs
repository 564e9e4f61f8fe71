//! Core types for the limit engine

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::AMOUNT_SCALE;

/// Limit rule identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule_{}", self.0)
    }
}

/// Hot-number limit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HotLimitId(pub u32);

impl fmt::Display for HotLimitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hot_{}", self.0)
    }
}

/// Draw identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DrawId(pub u32);

/// Betting pool (banca) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BettingPoolId(pub u32);

/// Zone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// External group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalGroupId(pub u32);

/// Money amount (stored as i64 for determinism, 4 decimal places)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64); // Internal: 1 unit = 0.0001

impl Amount {
    /// Create a new Amount from f64 (converts to fixed-point)
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn new(value: f64) -> Self {
        Self((value * AMOUNT_SCALE as f64).round() as i64)
    }

    /// Get the amount as f64
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / AMOUNT_SCALE as f64
    }

    /// Get amount as raw fixed-point i64
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Create from raw fixed-point i64
    #[must_use]
    pub const fn from_i64(raw: i64) -> Self {
        Self(raw)
    }

    /// Checked addition; None on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction; None on overflow
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtraction clamped at zero
    #[must_use]
    pub const fn saturating_sub_floor_zero(self, other: Self) -> Self {
        let v = self.0.saturating_sub(other.0);
        Self(if v < 0 { 0 } else { v })
    }

    /// Check if amount is negative
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Check if amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Zero amount
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

/// One monetizable facet of a play type. A limit rule or hot-number limit
/// constrains a subset of these; a field absent from a rule's ceiling map is
/// unconstrained by that rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BetField {
    /// Straight play on a single number
    Directo,
    /// Pale first payout
    Pale1,
    /// Pale second payout
    Pale2,
    /// Tripleta first leg
    Tripleta1,
    /// Tripleta second leg
    Tripleta2,
    /// Tripleta third leg
    Tripleta3,
}

impl BetField {
    /// All fields, in display order
    pub const ALL: [Self; 6] = [
        Self::Directo,
        Self::Pale1,
        Self::Pale2,
        Self::Tripleta1,
        Self::Tripleta2,
        Self::Tripleta3,
    ];
}

impl fmt::Display for BetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Directo => "directo",
            Self::Pale1 => "pale_1",
            Self::Pale2 => "pale_2",
            Self::Tripleta1 => "tripleta_1",
            Self::Tripleta2 => "tripleta_2",
            Self::Tripleta3 => "tripleta_3",
        };
        write!(f, "{name}")
    }
}

/// Days-of-week bitmask: bit 0 = Monday .. bit 6 = Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayOfWeekMask(pub u8);

impl DayOfWeekMask {
    /// Every day of the week
    pub const ALL: Self = Self(0b0111_1111);

    /// Mask with a single day set
    #[must_use]
    pub const fn from_weekday(day: Weekday) -> Self {
        Self(1 << day.num_days_from_monday())
    }

    /// Mask from a list of days
    #[must_use]
    pub fn from_days(days: &[Weekday]) -> Self {
        let mut mask = 0u8;
        for day in days {
            mask |= 1 << day.num_days_from_monday();
        }
        Self(mask)
    }

    /// Whether the given weekday's bit is set
    #[must_use]
    pub const fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether no day is set (a rule with an empty mask never applies)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 & 0b0111_1111 == 0
    }
}

impl Default for DayOfWeekMask {
    fn default() -> Self {
        Self::ALL
    }
}
