//! Order lifecycle types
//!
//! An order is created by SUBMIT, mutated in place by partial fills, and
//! destroyed by exactly one of: full fill, explicit cancel, or expiry.

use crate::ids::{OrderId, ParticipantId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask / offer)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire field value per the message format
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(()),
        }
    }
}

/// Why an order was rejected or removed without a fill.
///
/// This is the closed reason set of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Time-to-live deadline reached
    Expired,
    /// Explicitly cancelled by a CANCEL message
    Cancelled,
    /// Failed price/quantity validation at ingestion
    InvalidPrice,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Expired => "expired",
            RejectReason::Cancelled => "cancelled",
            RejectReason::InvalidPrice => "invalid_price",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RejectReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expired" => Ok(RejectReason::Expired),
            "cancelled" => Ok(RejectReason::Cancelled),
            "invalid_price" => Ok(RejectReason::InvalidPrice),
            _ => Err(()),
        }
    }
}

/// Which side of a batch clearing an AWARD settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRole {
    Producer,
    Consumer,
}

impl MarketRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRole::Producer => "producer",
            MarketRole::Consumer => "consumer",
        }
    }
}

impl fmt::Display for MarketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "producer" => Ok(MarketRole::Producer),
            "consumer" => Ok(MarketRole::Consumer),
            _ => Err(()),
        }
    }
}

/// A live order as held by the engine.
///
/// `quantity` is the remaining quantity; it strictly decreases only through
/// matching. The id is assigned by the engine at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: ParticipantId,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub submitted_tick: u64,
    pub expiry_tick: u64,
}

impl Order {
    /// Create a new order expiring `ttl` ticks after submission.
    pub fn new(
        id: OrderId,
        owner: ParticipantId,
        side: Side,
        quantity: Quantity,
        price: Price,
        submitted_tick: u64,
        ttl: u64,
    ) -> Self {
        Self {
            id,
            owner,
            side,
            quantity,
            price,
            submitted_tick,
            expiry_tick: submitted_tick + ttl,
        }
    }

    /// Apply a partial fill to the remaining quantity.
    pub fn fill(&mut self, traded: Decimal) {
        self.quantity.reduce(traded);
    }

    /// Remaining quantity at or below the fill epsilon.
    pub fn is_filled(&self) -> bool {
        self.quantity.is_exhausted()
    }

    /// Past its time-to-live at the given tick.
    pub fn is_expired(&self, tick: u64) -> bool {
        self.expiry_tick <= tick
    }
}
