//! Fixed-point numeric types for prices and energy quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! The unbounded-supply sentinel is a tagged variant rather than a float
//! infinity, so it can never leak into subtraction or comparison arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remaining quantity at or below this threshold counts as fully filled.
pub fn fill_epsilon() -> Decimal {
    // 1e-6
    Decimal::new(1, 6)
}

/// Limit price in currency units per kWh.
///
/// The type itself does not enforce non-negativity: validation happens at
/// ingestion so that a negative-priced SUBMIT can still be answered with a
/// REJECT instead of being silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Wrap a decimal price value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Zero price.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the inner decimal.
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Order quantity in kWh.
///
/// `Unbounded` marks backup supply that acts as an unlimited source or sink:
/// it participates in priority like any other order but is immortal with
/// respect to quantity exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    /// Finite energy amount.
    Finite(Decimal),
    /// Never exhausted by matching; removed only by cancel or expiry.
    Unbounded,
}

impl Quantity {
    /// A finite quantity.
    pub const fn finite(value: Decimal) -> Self {
        Self::Finite(value)
    }

    /// Zero quantity.
    pub fn zero() -> Self {
        Self::Finite(Decimal::ZERO)
    }

    pub const fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// The finite value, if any.
    pub const fn as_finite(&self) -> Option<Decimal> {
        match self {
            Self::Finite(q) => Some(*q),
            Self::Unbounded => None,
        }
    }

    /// Strictly positive (unbounded counts as positive).
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Finite(q) => *q > Decimal::ZERO,
            Self::Unbounded => true,
        }
    }

    /// Fully filled: finite remainder at or below the fill epsilon.
    /// Unbounded quantities are never exhausted.
    pub fn is_exhausted(&self) -> bool {
        match self {
            Self::Finite(q) => *q <= fill_epsilon(),
            Self::Unbounded => false,
        }
    }

    /// Reduce by a finite fill. Unbounded quantities are unchanged; finite
    /// quantities floor at zero.
    pub fn reduce(&mut self, fill: Decimal) {
        if let Self::Finite(q) = self {
            *q = (*q - fill).max(Decimal::ZERO);
        }
    }

    /// Sum for demand aggregation. Any unbounded operand makes the sum
    /// unbounded.
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => Self::Finite(a + b),
            _ => Self::Unbounded,
        }
    }

    /// Tradeable quantity between two sides: the smaller of the two, where
    /// an unbounded side never limits the trade. Returns `None` when both
    /// sides are unbounded and no finite trade quantity exists.
    pub fn min_tradeable(a: Quantity, b: Quantity) -> Option<Decimal> {
        match (a, b) {
            (Self::Finite(x), Self::Finite(y)) => Some(x.min(y)),
            (Self::Finite(x), Self::Unbounded) => Some(x),
            (Self::Unbounded, Self::Finite(y)) => Some(y),
            (Self::Unbounded, Self::Unbounded) => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(q) => write!(f, "{}", q),
            Self::Unbounded => write!(f, "inf"),
        }
    }
}

impl FromStr for Quantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Infinity" is what the legacy feed emitted for backup supply
        match s {
            "inf" | "unbounded" | "Infinity" => Ok(Self::Unbounded),
            _ => Decimal::from_str(s).map(Self::Finite),
        }
    }
}
