//! Backup producer
//!
//! Conventional generation: effectively unlimited supply offered every cycle
//! at the last market price plus a fixed margin. Its orders use the
//! unbounded quantity sentinel and are only ever removed by cancel or
//! expiry.

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
pub struct BackupConfig {
    /// Fixed margin over the last market price.
    pub margin: Decimal,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            margin: Decimal::new(5, 2), // 0.05
        }
    }
}

/// Backup producer decision core.
pub struct Backup {
    config: BackupConfig,
    last_price: Decimal,
    open: Option<OrderId>,
}

impl Backup {
    pub fn new(config: BackupConfig) -> Self {
        Self {
            config,
            last_price: Decimal::new(6, 2), // 0.06
            open: None,
        }
    }

    pub fn on_message(&mut self, message: &WireMessage) {
        match message {
            WireMessage::PriceTick { price } => {
                self.last_price = price.as_decimal();
            }
            WireMessage::Fill { qty, price, .. } => {
                debug!(%qty, %price, "backup dispatched");
            }
            WireMessage::Reject { id, .. } => {
                if self.open == Some(*id) {
                    self.open = None;
                }
            }
            _ => {}
        }
    }

    /// Refresh the standing unbounded offer.
    pub fn next_cycle(&mut self) -> (Option<OrderId>, (Quantity, Price)) {
        let stale = self.open.take();
        let price = Price::new(self.last_price + self.config.margin);
        (stale, (Quantity::Unbounded, price))
    }

    pub fn record_open(&mut self, id: Option<OrderId>) {
        self.open = id;
    }
}

/// Interval-driven task wrapper.
pub async fn run(
    mut backup: Backup,
    id: ParticipantId,
    handle: EngineHandle,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for message in drain_mailbox(&mut inbox) {
            backup.on_message(&message);
        }
        let (stale, (qty, price)) = backup.next_cycle();
        if let Some(order_id) = stale {
            handle.send(&id, WireMessage::Cancel { id: order_id }.encode());
        }
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
        backup.record_open(assigned);
    }
}
