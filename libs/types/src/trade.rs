//! Trade records
//!
//! A trade is an immutable record of one completed match. Trades are events,
//! not state: the engine emits them and keeps nothing.

use crate::ids::{OrderId, ParticipantId};
use crate::numeric::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Record of a completed match between a bid and an ask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: ParticipantId,
    pub seller: ParticipantId,
    pub quantity: Decimal,
    /// Execution price: always the resting ask's limit price.
    pub price: Price,
    pub tick: u64,
}

impl Trade {
    /// Traded value (quantity × price).
    pub fn value(&self) -> Decimal {
        self.quantity * self.price.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_trade_value() {
        let trade = Trade {
            buy_order_id: OrderId::new(2),
            sell_order_id: OrderId::new(1),
            buyer: ParticipantId::new("consumer"),
            seller: ParticipantId::new("solar"),
            quantity: Decimal::from(6),
            price: Price::from_str("0.05").unwrap(),
            tick: 4,
        };
        assert_eq!(trade.value(), Decimal::from_str("0.30").unwrap());
    }
}
