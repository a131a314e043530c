//! Bid (buy-side) order book
//!
//! Buy orders sorted by price descending (best bid first), FIFO within each
//! price level. Uses BTreeMap for deterministic iteration.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;

/// Bid (buy) side of the order book.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; BTreeMap iterates ascending, so the best bid is last.
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order id at its price level.
    pub fn insert(&mut self, price: Price, id: OrderId) {
        self.levels.entry(price).or_default().push_back(id);
    }

    /// Remove an order from its price level.
    ///
    /// Returns true if the order was found and removed.
    pub fn remove(&mut self, id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(id) {
                // Remove empty price levels to keep the book clean
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Highest-priority bid: best (highest) price, earliest id at that price.
    pub fn best(&self) -> Option<(Price, OrderId)> {
        self.levels
            .iter()
            .next_back()
            .and_then(|(price, level)| level.front().map(|id| (*price, id)))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.levels.values().map(PriceLevel::len).sum()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// All resting bids in priority order (price descending, id ascending).
    pub fn iter_priority(&self) -> Vec<(Price, OrderId)> {
        self.levels
            .iter()
            .rev()
            .flat_map(|(price, level)| level.ids().map(move |id| (*price, id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn p(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    #[test]
    fn test_best_is_highest_price() {
        let mut book = BidBook::new();
        book.insert(p("0.05"), OrderId::new(1));
        book.insert(p("0.06"), OrderId::new(2));
        book.insert(p("0.04"), OrderId::new(3));

        assert_eq!(book.best(), Some((p("0.06"), OrderId::new(2))));
        assert_eq!(book.level_count(), 3);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = BidBook::new();
        book.insert(p("0.05"), OrderId::new(1));
        book.insert(p("0.05"), OrderId::new(2));

        assert_eq!(book.best(), Some((p("0.05"), OrderId::new(1))));
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_remove_clears_empty_level() {
        let mut book = BidBook::new();
        book.insert(p("0.05"), OrderId::new(1));

        assert!(book.remove(&OrderId::new(1), p("0.05")));
        assert!(book.is_empty());
        assert!(!book.remove(&OrderId::new(1), p("0.05")));
    }

    #[test]
    fn test_iter_priority_descending() {
        let mut book = BidBook::new();
        book.insert(p("0.04"), OrderId::new(1));
        book.insert(p("0.06"), OrderId::new(2));
        book.insert(p("0.06"), OrderId::new(3));
        book.insert(p("0.05"), OrderId::new(4));

        let priority = book.iter_priority();
        assert_eq!(
            priority,
            vec![
                (p("0.06"), OrderId::new(2)),
                (p("0.06"), OrderId::new(3)),
                (p("0.05"), OrderId::new(4)),
                (p("0.04"), OrderId::new(1)),
            ]
        );
    }
}
