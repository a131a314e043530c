//! Crossing detection
//!
//! Determines when the best bid and the best ask are price-compatible.

use types::numeric::Price;

/// A bid and an ask can match when the bid price is at or above the ask
/// price. The resulting execution price is always the ask's (see the
/// continuous engine).
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}
