//! Position-limited trader
//!
//! Bids a fixed clip below the last market price while under its position
//! limit, cancelling the previous bid each cycle. Each fill slowly decays
//! the margin.

use std::time::Duration;

use clearing_engine::{Envelope, EngineHandle};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{Price, Quantity};
use types::order::Side;

use super::drain_mailbox;

#[derive(Debug, Clone)]
pub struct TraderConfig {
    /// Discount below the last price.
    pub margin: Decimal,
    /// Max accumulated position in kWh.
    pub position_limit: Decimal,
    /// Clip size per order.
    pub order_size: Decimal,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            margin: Decimal::new(1, 2), // 0.01
            position_limit: Decimal::from(50),
            order_size: Decimal::from(10),
        }
    }
}

/// Trader decision core.
pub struct Trader {
    config: TraderConfig,
    margin: Decimal,
    last_price: Decimal,
    position: Decimal,
    open_bid: Option<OrderId>,
}

impl Trader {
    pub fn new(config: TraderConfig) -> Self {
        let margin = config.margin;
        Self {
            config,
            margin,
            last_price: Decimal::new(6, 2), // 0.06
            position: Decimal::ZERO,
            open_bid: None,
        }
    }

    pub fn position(&self) -> Decimal {
        self.position
    }

    pub fn on_message(&mut self, message: &WireMessage) {
        match message {
            WireMessage::PriceTick { price } => {
                self.last_price = price.as_decimal();
            }
            WireMessage::Fill { id, qty, price, .. } => {
                if self.open_bid != Some(*id) {
                    return;
                }
                self.position += *qty;
                debug!(%qty, %price, position = %self.position, "trader filled");
                // a touched quote can afford to bid a little closer
                self.margin = (self.margin * Decimal::new(999, 3)).max(Decimal::new(2, 3));
            }
            WireMessage::Reject { id, .. } => {
                if self.open_bid == Some(*id) {
                    self.open_bid = None;
                }
            }
            _ => {}
        }
    }

    /// Refresh the standing bid, or stand down at the position limit.
    pub fn next_cycle(&mut self) -> (Option<OrderId>, Option<(Quantity, Price)>) {
        let stale = self.open_bid.take();
        if self.position >= self.config.position_limit {
            return (stale, None);
        }
        let price = (self.last_price - self.margin).max(Decimal::ZERO);
        (
            stale,
            Some((
                Quantity::finite(self.config.order_size),
                Price::new(price),
            )),
        )
    }

    pub fn record_open(&mut self, id: Option<OrderId>) {
        self.open_bid = id;
    }
}

/// Interval-driven task wrapper.
pub async fn run(
    mut trader: Trader,
    id: ParticipantId,
    handle: EngineHandle,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for message in drain_mailbox(&mut inbox) {
            trader.on_message(&message);
        }
        let (stale, bid) = trader.next_cycle();
        if let Some(order_id) = stale {
            handle.send(&id, WireMessage::Cancel { id: order_id }.encode());
        }
        if let Some((qty, price)) = bid {
            let assigned = handle
                .submit(
                    &id,
                    WireMessage::Submit {
                        side: Side::Buy,
                        qty,
                        price,
                    }
                    .encode(),
                )
                .await;
            trader.record_open(assigned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fill(id: u64, qty: i64) -> WireMessage {
        WireMessage::Fill {
            id: OrderId::new(id),
            qty: Decimal::from(qty),
            price: Price::from_str("0.05").unwrap(),
            from: ParticipantId::new("solar"),
        }
    }

    #[test]
    fn test_bids_below_last_price() {
        let mut trader = Trader::new(TraderConfig::default());
        let (_, bid) = trader.next_cycle();
        let (qty, price) = bid.unwrap();
        assert_eq!(qty.as_finite(), Some(Decimal::from(10)));
        assert_eq!(price, Price::from_str("0.05").unwrap());
    }

    #[test]
    fn test_position_limit_stands_down() {
        let mut trader = Trader::new(TraderConfig::default());
        let (_, bid) = trader.next_cycle();
        assert!(bid.is_some());
        trader.record_open(Some(OrderId::new(1)));

        // five full clips reach the 50 kWh limit
        for _ in 0..5 {
            trader.on_message(&fill(1, 10));
        }
        assert_eq!(trader.position(), Decimal::from(50));

        let (_, bid) = trader.next_cycle();
        assert!(bid.is_none(), "no bid at the position limit");
    }

    #[test]
    fn test_fill_for_other_order_ignored() {
        let mut trader = Trader::new(TraderConfig::default());
        trader.record_open(Some(OrderId::new(1)));
        trader.on_message(&fill(2, 10));
        assert_eq!(trader.position(), Decimal::ZERO);
    }

    #[test]
    fn test_margin_decays_on_fill_with_floor() {
        let mut trader = Trader::new(TraderConfig::default());
        trader.record_open(Some(OrderId::new(1)));
        for _ in 0..10_000 {
            trader.on_message(&fill(1, 0));
        }
        // decays towards but never below the floor
        assert_eq!(trader.margin, Decimal::new(2, 3));
    }
}
