//! Market metrics for simulation runs
//!
//! Aggregates the engine's observer side channel into the counters the
//! dashboard cares about: orders, trades, terminal outcomes, traded volume,
//! and the price series.

use clearing_engine::{MarketEvent, RemovalKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated market metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub total_orders: u64,
    pub total_trades: u64,
    pub total_fills: u64,
    pub total_cancels: u64,
    pub total_expiries: u64,
    pub total_batches: u64,
    /// Sum of traded quantity × execution price.
    pub total_value: Decimal,
    /// Sum of traded quantity (kWh), both mechanisms.
    pub total_energy: Decimal,
    pub last_price: Option<Decimal>,
    /// One entry per broadcast price.
    pub price_points: Vec<Decimal>,
}

impl MarketMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single observer event.
    pub fn record(&mut self, event: &MarketEvent) {
        match event {
            MarketEvent::OrderAccepted { .. } => {
                self.total_orders += 1;
            }
            MarketEvent::TradeExecuted { trade } => {
                self.total_trades += 1;
                self.total_energy += trade.quantity;
                self.total_value += trade.value();
            }
            MarketEvent::OrderRemoved { kind, .. } => match kind {
                RemovalKind::Filled => self.total_fills += 1,
                RemovalKind::Cancelled => self.total_cancels += 1,
                RemovalKind::Expired => self.total_expiries += 1,
            },
            MarketEvent::PriceTick { price, .. } => {
                self.last_price = Some(price.as_decimal());
                self.price_points.push(price.as_decimal());
            }
            MarketEvent::BatchCleared { cleared_qty, price, .. } => {
                self.total_batches += 1;
                self.total_energy += *cleared_qty;
                self.total_value += *cleared_qty * price.as_decimal();
            }
        }
    }

    /// Process a slice of events.
    pub fn ingest(&mut self, events: &[MarketEvent]) {
        for event in events {
            self.record(event);
        }
    }

    /// Volume-weighted average price over everything recorded.
    pub fn vwap(&self) -> Option<Decimal> {
        if self.total_energy.is_zero() {
            return None;
        }
        Some(self.total_value / self.total_energy)
    }

    /// Build a summary string.
    pub fn summary(&self) -> String {
        format!(
            "Orders: {} | Trades: {} | Fills: {} | Cancels: {} | Expiries: {} | Energy: {} kWh | Last price: {}",
            self.total_orders,
            self.total_trades,
            self.total_fills,
            self.total_cancels,
            self.total_expiries,
            self.total_energy,
            self.last_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{OrderId, ParticipantId};
    use types::numeric::{Price, Quantity};
    use types::order::Side;
    use types::trade::Trade;

    fn price(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    #[test]
    fn test_record_order_accepted() {
        let mut metrics = MarketMetrics::new();
        metrics.record(&MarketEvent::OrderAccepted {
            id: OrderId::new(1),
            owner: ParticipantId::new("solar"),
            side: Side::Sell,
            price: price("0.05"),
            quantity: Quantity::finite(Decimal::from(10)),
            tick: 0,
        });
        assert_eq!(metrics.total_orders, 1);
    }

    #[test]
    fn test_record_trade_accumulates_value() {
        let mut metrics = MarketMetrics::new();
        metrics.record(&MarketEvent::TradeExecuted {
            trade: Trade {
                buy_order_id: OrderId::new(2),
                sell_order_id: OrderId::new(1),
                buyer: ParticipantId::new("consumer"),
                seller: ParticipantId::new("solar"),
                quantity: Decimal::from(6),
                price: price("0.05"),
                tick: 1,
            },
        });
        assert_eq!(metrics.total_trades, 1);
        assert_eq!(metrics.total_energy, Decimal::from(6));
        assert_eq!(metrics.total_value, Decimal::from_str("0.30").unwrap());
        assert_eq!(metrics.vwap(), Some(Decimal::from_str("0.05").unwrap()));
    }

    #[test]
    fn test_removal_kinds_split_counters() {
        let mut metrics = MarketMetrics::new();
        for kind in [
            RemovalKind::Filled,
            RemovalKind::Cancelled,
            RemovalKind::Expired,
        ] {
            metrics.record(&MarketEvent::OrderRemoved {
                id: OrderId::new(1),
                kind,
                tick: 0,
            });
        }
        assert_eq!(metrics.total_fills, 1);
        assert_eq!(metrics.total_cancels, 1);
        assert_eq!(metrics.total_expiries, 1);
    }

    #[test]
    fn test_price_series() {
        let mut metrics = MarketMetrics::new();
        metrics.ingest(&[
            MarketEvent::PriceTick {
                price: price("0.06"),
                tick: 1,
            },
            MarketEvent::PriceTick {
                price: price("0.05"),
                tick: 2,
            },
        ]);
        assert_eq!(metrics.price_points.len(), 2);
        assert_eq!(metrics.last_price, Some(Decimal::from_str("0.05").unwrap()));
    }

    #[test]
    fn test_summary_mentions_counters() {
        let metrics = MarketMetrics::new();
        let summary = metrics.summary();
        assert!(summary.contains("Orders: 0"));
        assert!(summary.contains("Last price: -"));
    }
}
