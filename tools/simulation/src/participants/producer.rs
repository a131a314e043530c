//! Renewable producer
//!
//! Sells whatever the current cycle makes available at cost plus an adaptive
//! margin, refreshing its standing offer every cycle. Availability varies
//! with a seeded RNG so runs are reproducible.

use std::time::Duration;

use clearing_engine::{Envelope, EngineHandle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{Price, Quantity};
use types::order::Side;

use super::drain_mailbox;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Nameplate capacity in kWh per cycle.
    pub capacity: Decimal,
    /// Marginal cost of production.
    pub base_cost: Decimal,
    /// Starting margin over cost.
    pub margin: Decimal,
    /// Margin learning rate.
    pub alpha: Decimal,
    /// RNG seed for the availability factor.
    pub seed: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            capacity: Decimal::from(50),
            base_cost: Decimal::new(35, 3),  // 0.035
            margin: Decimal::new(5, 3),      // 0.005
            alpha: Decimal::new(3, 2),       // 0.03
            seed: 7,
        }
    }
}

/// Producer decision core.
pub struct Producer {
    config: ProducerConfig,
    rng: ChaCha8Rng,
    margin: Decimal,
    last_price: Decimal,
    open: Option<OrderId>,
    offered: Decimal,
    sold: Decimal,
}

impl Producer {
    pub fn new(config: ProducerConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let margin = config.margin;
        Self {
            config,
            rng,
            margin,
            last_price: Decimal::new(6, 2), // 0.06
            open: None,
            offered: Decimal::ZERO,
            sold: Decimal::ZERO,
        }
    }

    pub fn margin(&self) -> Decimal {
        self.margin
    }

    /// Fold one engine message into internal state.
    pub fn on_message(&mut self, message: &WireMessage) {
        match message {
            WireMessage::Fill { id, qty, .. } => {
                if self.open == Some(*id) {
                    self.sold += *qty;
                }
            }
            WireMessage::Award { qty, price, .. } => {
                self.sold += *qty;
                self.last_price = price.as_decimal();
            }
            WireMessage::PriceTick { price } => {
                self.last_price = price.as_decimal();
            }
            WireMessage::Reject { id, .. } => {
                if self.open == Some(*id) {
                    self.open = None;
                }
            }
            _ => {}
        }
    }

    /// Start a new cycle: the order to cancel (stale offer) and the fresh
    /// offer to place.
    pub fn next_cycle(&mut self) -> (Option<OrderId>, Option<(Quantity, Price)>) {
        let stale = self.open.take();
        self.adapt_margin();

        // availability factor in [0.20, 1.00]
        let factor = Decimal::new(i64::from(self.rng.gen_range(20..=100u32)), 2);
        let available = self.config.capacity * factor;
        if available <= Decimal::ZERO {
            self.offered = Decimal::ZERO;
            self.sold = Decimal::ZERO;
            return (stale, None);
        }

        // cost plus margin, but never undercut the market by more than 0.02
        let floor = self.last_price - Decimal::new(2, 2);
        let price = (self.config.base_cost + self.margin).max(floor);

        self.offered = available;
        self.sold = Decimal::ZERO;
        (stale, Some((Quantity::finite(available), Price::new(price))))
    }

    /// Note the id the engine assigned to the fresh offer.
    pub fn record_open(&mut self, id: Option<OrderId>) {
        self.open = id;
    }

    // satisfied cycles shave the margin, starved cycles grow it
    fn adapt_margin(&mut self) {
        if self.offered <= Decimal::ZERO {
            return;
        }
        let utilization = self.sold / self.offered;
        self.margin += self.config.alpha * (Decimal::new(9, 1) - utilization);
        let cap = Decimal::new(2, 2); // 0.02
        self.margin = self.margin.max(-cap).min(cap);
    }
}

/// Interval-driven task wrapper.
pub async fn run(
    mut producer: Producer,
    id: ParticipantId,
    handle: EngineHandle,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for message in drain_mailbox(&mut inbox) {
            producer.on_message(&message);
        }
        let (stale, offer) = producer.next_cycle();
        if let Some(order_id) = stale {
            handle.send(&id, WireMessage::Cancel { id: order_id }.encode());
        }
        if let Some((qty, price)) = offer {
            debug!(%id, %qty, %price, "offering");
            let assigned = handle
                .submit(
                    &id,
                    WireMessage::Submit {
                        side: Side::Sell,
                        qty,
                        price,
                    }
                    .encode(),
                )
                .await;
            producer.record_open(assigned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_offer_is_reproducible_per_seed() {
        let mut a = Producer::new(ProducerConfig::default());
        let mut b = Producer::new(ProducerConfig::default());
        assert_eq!(a.next_cycle().1, b.next_cycle().1);
        assert_eq!(a.next_cycle().1, b.next_cycle().1);
    }

    #[test]
    fn test_offer_bounded_by_capacity() {
        let mut producer = Producer::new(ProducerConfig::default());
        for _ in 0..50 {
            if let (_, Some((qty, _))) = producer.next_cycle() {
                let q = qty.as_finite().unwrap();
                assert!(q > Decimal::ZERO);
                assert!(q <= Decimal::from(50));
            }
        }
    }

    #[test]
    fn test_starved_producer_raises_margin_to_cap() {
        let mut producer = Producer::new(ProducerConfig::default());
        let before = producer.margin();
        // cycles with zero sales push the margin up to its cap
        for _ in 0..10 {
            let (_, offer) = producer.next_cycle();
            assert!(offer.is_some());
            producer.record_open(Some(OrderId::new(1)));
        }
        assert!(producer.margin() > before);
        assert_eq!(producer.margin(), Decimal::new(2, 2));
    }

    #[test]
    fn test_stale_offer_cancelled_next_cycle() {
        let mut producer = Producer::new(ProducerConfig::default());
        let (stale, _) = producer.next_cycle();
        assert_eq!(stale, None);
        producer.record_open(Some(OrderId::new(42)));
        let (stale, _) = producer.next_cycle();
        assert_eq!(stale, Some(OrderId::new(42)));
    }

    #[test]
    fn test_price_floor_follows_market() {
        let mut producer = Producer::new(ProducerConfig::default());
        producer.on_message(&WireMessage::PriceTick {
            price: Price::from_str("0.10").unwrap(),
        });
        let (_, offer) = producer.next_cycle();
        let (_, price) = offer.unwrap();
        // never undercut 0.10 by more than 0.02
        assert!(price.as_decimal() >= Decimal::from_str("0.08").unwrap());
    }
}
