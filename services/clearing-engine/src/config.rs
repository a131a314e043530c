//! Engine configuration
//!
//! One engine instance runs exactly one clearing mechanism per deployment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::numeric::Price;

/// Which clearing mechanism this deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearingMode {
    /// Cross the book after every submission (price-time priority).
    Continuous,
    /// Accumulate an interval, clear at one uniform price per tick.
    Batch,
}

impl Default for ClearingMode {
    fn default() -> Self {
        ClearingMode::Continuous
    }
}

/// Engine configuration with defaults matching the reference deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub mode: ClearingMode,
    /// Logical-clock period in milliseconds.
    pub tick_interval_ms: u64,
    /// Order time-to-live in ticks (continuous mode).
    pub order_ttl_ticks: u64,
    /// Price broadcast before the first trade establishes one.
    pub initial_price: Price,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            mode: ClearingMode::Continuous,
            tick_interval_ms: 1000,
            order_ttl_ticks: 3,
            initial_price: Price::new(Decimal::new(6, 2)), // 0.06
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let config = MarketConfig::default();
        assert_eq!(config.mode, ClearingMode::Continuous);
        assert_eq!(config.order_ttl_ticks, 3);
        assert_eq!(config.initial_price, Price::from_str("0.06").unwrap());
    }

    #[test]
    fn test_partial_overrides_from_json() {
        let config: MarketConfig =
            serde_json::from_str(r#"{"mode":"batch","tick_interval_ms":250}"#).unwrap();
        assert_eq!(config.mode, ClearingMode::Batch);
        assert_eq!(config.tick_interval_ms, 250);
        // untouched fields keep defaults
        assert_eq!(config.order_ttl_ticks, 3);
    }
}
