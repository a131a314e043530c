//! Engine event definitions
//!
//! Every engine operation returns the events it produced: directed wire
//! messages for order owners, broadcasts for all participants, and typed
//! observer events for the dashboard side channel.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

/// Why an order left the book. Forms the order-book delta stream together
/// with `OrderAccepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalKind {
    Filled,
    Cancelled,
    Expired,
}

/// Observer side-channel events consumed by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum MarketEvent {
    /// An order passed validation and entered the book (or batch interval).
    OrderAccepted {
        id: OrderId,
        owner: ParticipantId,
        side: Side,
        price: Price,
        quantity: Quantity,
        tick: u64,
    },
    /// An order reached its terminal state.
    OrderRemoved {
        id: OrderId,
        kind: RemovalKind,
        tick: u64,
    },
    /// A continuous-mode match completed.
    TradeExecuted { trade: Trade },
    /// The engine broadcast a price.
    PriceTick { price: Price, tick: u64 },
    /// A batch interval cleared.
    BatchCleared {
        price: Price,
        cleared_qty: Decimal,
        tick: u64,
    },
}

/// One unit of engine output, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Deliver a wire message to one participant's mailbox.
    Deliver {
        to: ParticipantId,
        message: WireMessage,
    },
    /// Deliver a wire message to every registered participant.
    Broadcast { message: WireMessage },
    /// Publish to the observer side channel.
    Observe { event: MarketEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_event_serialization() {
        let event = MarketEvent::PriceTick {
            price: "0.05".parse().unwrap(),
            tick: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"PriceTick\""));
        let back: MarketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
