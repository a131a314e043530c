//! Battery storage
//!
//! Arbitrages on state of charge: charges (bids) when low, discharges
//! (offers) when high, one charge-rate-sized order per cycle. Awards and
//! fills move the state of charge.

use std::time::Duration;

use clearing_engine::{Envelope, EngineHandle};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{Price, Quantity};
use types::order::{MarketRole, Side};

use super::drain_mailbox;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Usable capacity in kWh.
    pub capacity: Decimal,
    /// Starting state of charge in kWh.
    pub initial_soc: Decimal,
    /// Spread around the market price.
    pub margin: Decimal,
    /// Max energy moved per cycle.
    pub charge_rate: Decimal,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity: Decimal::from(100),
            initial_soc: Decimal::from(50),
            margin: Decimal::new(1, 2), // 0.01
            charge_rate: Decimal::from(10),
        }
    }
}

/// Storage decision core.
pub struct Storage {
    config: StorageConfig,
    soc: Decimal,
    last_price: Decimal,
    open: Option<(OrderId, Side)>,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Self {
        let soc = config.initial_soc;
        Self {
            config,
            soc,
            last_price: Decimal::new(6, 2), // 0.06
            open: None,
        }
    }

    pub fn soc(&self) -> Decimal {
        self.soc
    }

    pub fn on_message(&mut self, message: &WireMessage) {
        match message {
            WireMessage::PriceTick { price } => {
                self.last_price = price.as_decimal();
            }
            WireMessage::Award { qty, price, role } => {
                match role {
                    MarketRole::Producer => self.discharge(*qty),
                    MarketRole::Consumer => self.charge(*qty),
                }
                self.last_price = price.as_decimal();
            }
            WireMessage::Fill { id, qty, .. } => {
                let Some((open_id, side)) = self.open else {
                    return;
                };
                if open_id != *id {
                    return;
                }
                match side {
                    Side::Sell => self.discharge(*qty),
                    Side::Buy => self.charge(*qty),
                }
            }
            WireMessage::Reject { id, .. } => {
                if matches!(self.open, Some((open_id, _)) if open_id == *id) {
                    self.open = None;
                }
            }
            _ => {}
        }
    }

    /// One quote per cycle, picked from the state-of-charge band.
    pub fn next_cycle(&mut self) -> (Option<OrderId>, (Side, Quantity, Price)) {
        let stale = self.open.take().map(|(id, _)| id);

        let ratio = self.soc / self.config.capacity;
        let rate = Quantity::finite(self.config.charge_rate);
        let quote = if ratio < Decimal::new(3, 1) {
            // desperate to charge: take anything
            (Side::Buy, rate, Price::zero())
        } else if ratio < Decimal::new(5, 1) {
            (
                Side::Buy,
                rate,
                Price::new((self.last_price - self.config.margin).max(Decimal::ZERO)),
            )
        } else if ratio < Decimal::new(7, 1) {
            (Side::Sell, rate, Price::new(self.last_price))
        } else {
            (
                Side::Sell,
                rate,
                Price::new(self.last_price + self.config.margin),
            )
        };
        debug!(soc = %self.soc, side = %quote.0, price = %quote.2, "storage quote");
        (stale, quote)
    }

    pub fn record_open(&mut self, id: Option<OrderId>, side: Side) {
        self.open = id.map(|id| (id, side));
    }

    fn charge(&mut self, qty: Decimal) {
        self.soc = (self.soc + qty).min(self.config.capacity);
    }

    fn discharge(&mut self, qty: Decimal) {
        self.soc = (self.soc - qty).max(Decimal::ZERO);
    }
}

/// Interval-driven task wrapper.
pub async fn run(
    mut storage: Storage,
    id: ParticipantId,
    handle: EngineHandle,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for message in drain_mailbox(&mut inbox) {
            storage.on_message(&message);
        }
        let (stale, (side, qty, price)) = storage.next_cycle();
        if let Some(order_id) = stale {
            handle.send(&id, WireMessage::Cancel { id: order_id }.encode());
        }
        let assigned = handle
            .submit(&id, WireMessage::Submit { side, qty, price }.encode())
            .await;
        storage.record_open(assigned, side);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn storage_at(soc: i64) -> Storage {
        Storage::new(StorageConfig {
            initial_soc: Decimal::from(soc),
            ..StorageConfig::default()
        })
    }

    #[test]
    fn test_low_soc_bids_at_any_price() {
        let mut storage = storage_at(20);
        let (_, (side, _, price)) = storage.next_cycle();
        assert_eq!(side, Side::Buy);
        assert_eq!(price, Price::zero());
    }

    #[test]
    fn test_mid_soc_bids_below_market() {
        let mut storage = storage_at(40);
        let (_, (side, _, price)) = storage.next_cycle();
        assert_eq!(side, Side::Buy);
        assert_eq!(price, Price::from_str("0.05").unwrap());
    }

    #[test]
    fn test_high_soc_offers_above_market() {
        let mut storage = storage_at(80);
        let (_, (side, _, price)) = storage.next_cycle();
        assert_eq!(side, Side::Sell);
        assert_eq!(price, Price::from_str("0.07").unwrap());
    }

    #[test]
    fn test_award_moves_state_of_charge() {
        let mut storage = storage_at(50);
        storage.on_message(&WireMessage::Award {
            qty: Decimal::from(10),
            price: Price::from_str("0.05").unwrap(),
            role: MarketRole::Consumer,
        });
        assert_eq!(storage.soc(), Decimal::from(60));

        storage.on_message(&WireMessage::Award {
            qty: Decimal::from(30),
            price: Price::from_str("0.05").unwrap(),
            role: MarketRole::Producer,
        });
        assert_eq!(storage.soc(), Decimal::from(30));
    }

    #[test]
    fn test_soc_clamped_to_capacity() {
        let mut storage = storage_at(95);
        storage.on_message(&WireMessage::Award {
            qty: Decimal::from(50),
            price: Price::from_str("0.05").unwrap(),
            role: MarketRole::Consumer,
        });
        assert_eq!(storage.soc(), Decimal::from(100));
    }

    #[test]
    fn test_fill_uses_open_order_side() {
        let mut storage = storage_at(60);
        let (_, (side, _, _)) = storage.next_cycle();
        assert_eq!(side, Side::Sell);
        storage.record_open(Some(OrderId::new(3)), side);

        storage.on_message(&WireMessage::Fill {
            id: OrderId::new(3),
            qty: Decimal::from(10),
            price: Price::from_str("0.06").unwrap(),
            from: ParticipantId::new("consumer"),
        });
        assert_eq!(storage.soc(), Decimal::from(50));
    }
}
