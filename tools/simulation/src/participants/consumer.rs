//! Household consumer
//!
//! Bids for an hourly load profile, carrying unmet demand forward as
//! backlog. The margin over its utility cap adapts: satisfied cycles pay
//! less next time, rejections pay a bit more.

use std::time::Duration;

use clearing_engine::{Envelope, EngineHandle};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{fill_epsilon, Price, Quantity};
use types::order::Side;

use super::drain_mailbox;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Demand per hour of day, in kWh.
    pub hourly_load: [i64; 24],
    /// Max willingness to pay per kWh.
    pub utility_cap: Decimal,
    /// Starting margin.
    pub margin: Decimal,
    /// Margin learning rate.
    pub alpha: Decimal,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            hourly_load: [
                1, 1, 1, 1, 1, 1, 2, 3, 3, 2, 2, 2, //
                2, 2, 2, 2, 3, 5, 5, 4, 3, 2, 1, 1,
            ],
            utility_cap: Decimal::new(12, 2), // 0.12
            margin: Decimal::new(5, 3),       // 0.005
            alpha: Decimal::new(3, 2),        // 0.03
        }
    }
}

/// Consumer decision core.
pub struct Consumer {
    config: ConsumerConfig,
    margin: Decimal,
    backlog: Decimal,
    open: Option<(OrderId, Decimal)>,
    hour: usize,
}

impl Consumer {
    pub fn new(config: ConsumerConfig) -> Self {
        let margin = config.margin;
        Self {
            config,
            margin,
            backlog: Decimal::ZERO,
            open: None,
            hour: 0,
        }
    }

    pub fn backlog(&self) -> Decimal {
        self.backlog
    }

    pub fn margin(&self) -> Decimal {
        self.margin
    }

    pub fn on_message(&mut self, message: &WireMessage) {
        match message {
            WireMessage::Fill { id, qty, .. } => {
                let Some((open_id, open_qty)) = self.open else {
                    return;
                };
                if open_id != *id {
                    return;
                }
                let remaining = (open_qty - *qty).max(Decimal::ZERO);
                self.backlog = (self.backlog - *qty).max(Decimal::ZERO);
                if remaining <= fill_epsilon() {
                    self.open = None;
                } else {
                    self.open = Some((open_id, remaining));
                }

                // satisfied -> shave the margin, pay less next time
                let satisfied = *qty / (*qty + remaining);
                self.margin += self.config.alpha * (Decimal::new(9, 1) - satisfied);
                self.margin = self
                    .margin
                    .max(Decimal::new(5, 3))
                    .min(Decimal::new(5, 2));
            }
            WireMessage::Award { qty, .. } => {
                self.backlog = (self.backlog - *qty).max(Decimal::ZERO);
            }
            WireMessage::Reject { id, .. } => {
                let Some((open_id, open_qty)) = self.open else {
                    return;
                };
                if open_id != *id {
                    return;
                }
                // unmet demand carries forward and we pay a bit more
                self.backlog += open_qty;
                self.open = None;
                self.margin = (self.margin + Decimal::new(2, 3)).min(Decimal::new(5, 2));
            }
            _ => {}
        }
    }

    /// Advance one hour: the stale bid to cancel and the fresh bid to place.
    pub fn next_cycle(&mut self) -> (Option<OrderId>, Option<(Quantity, Price)>) {
        self.hour += 1;
        let stale = match self.open.take() {
            Some((id, qty)) => {
                // a cancelled bid's remainder returns to the backlog
                self.backlog += qty;
                Some(id)
            }
            None => None,
        };

        let load = Decimal::from(self.config.hourly_load[self.hour % 24]);
        let demand = load + self.backlog;
        if demand <= fill_epsilon() {
            return (stale, None);
        }

        let price = (self.config.utility_cap + self.margin).max(Decimal::ZERO);
        (stale, Some((Quantity::finite(demand), Price::new(price))))
    }

    pub fn record_open(&mut self, id: Option<OrderId>, qty: Decimal) {
        self.open = id.map(|id| (id, qty));
    }
}

/// Interval-driven task wrapper.
pub async fn run(
    mut consumer: Consumer,
    id: ParticipantId,
    handle: EngineHandle,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for message in drain_mailbox(&mut inbox) {
            consumer.on_message(&message);
        }
        let (stale, bid) = consumer.next_cycle();
        if let Some(order_id) = stale {
            handle.send(&id, WireMessage::Cancel { id: order_id }.encode());
        }
        if let Some((qty, price)) = bid {
            debug!(%id, %qty, %price, backlog = %consumer.backlog(), "bidding");
            let demand = qty.as_finite().unwrap_or_default();
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
            consumer.record_open(assigned, demand);
        }
    }
}
