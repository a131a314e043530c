//! Periodic uniform-price batch clearer
//!
//! The alternative clearing mechanism: submissions accumulate into transient
//! offer/bid lists for one interval; at interval end a single merit-order
//! auction computes one clearing price and one allocation, awards are sent,
//! and the interval's orders are discarded.
//!
//! Total demand is the sum of all bid quantities without a price filter, and
//! bids are awarded purely by price rank against the cleared quantity - a
//! bid below the clearing price can still be awarded.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;
use types::errors::OrderError;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{fill_epsilon, Price, Quantity};
use types::order::{MarketRole, RejectReason, Side};

use crate::config::MarketConfig;
use crate::events::{EngineEvent, MarketEvent, RemovalKind};

/// One order accumulated for the current clearing interval.
#[derive(Debug, Clone, PartialEq)]
struct BatchOrder {
    id: OrderId,
    owner: ParticipantId,
    quantity: Quantity,
    price: Price,
}

/// The batch-mode market clearing engine.
pub struct BatchEngine {
    offers: Vec<BatchOrder>,
    bids: Vec<BatchOrder>,
    next_id: u64,
    tick: u64,
}

impl BatchEngine {
    pub fn new(_config: &MarketConfig) -> Self {
        Self {
            offers: Vec::new(),
            bids: Vec::new(),
            next_id: 1,
            tick: 0,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Orders accumulated so far in the current interval (offers, bids).
    pub fn pending_counts(&self) -> (usize, usize) {
        (self.offers.len(), self.bids.len())
    }

    /// Accumulate a submission into the current interval.
    ///
    /// The batch auction accepts zero prices (a bid at 0 is a valid
    /// willingness signal); only negative prices and non-positive quantities
    /// are rejected.
    pub fn submit(
        &mut self,
        owner: &ParticipantId,
        side: Side,
        quantity: Quantity,
        price: Price,
    ) -> (OrderId, Vec<EngineEvent>) {
        let id = OrderId::new(self.next_id);
        self.next_id += 1;

        if let Err(err) = validate(quantity, price) {
            debug!(%id, %owner, %err, "batch order rejected at ingestion");
            let events = vec![EngineEvent::Deliver {
                to: owner.clone(),
                message: WireMessage::Reject {
                    id,
                    reason: RejectReason::InvalidPrice,
                },
            }];
            return (id, events);
        }

        let order = BatchOrder {
            id,
            owner: owner.clone(),
            quantity,
            price,
        };
        debug!(%id, %owner, %side, %quantity, %price, "interval order");
        match side {
            Side::Sell => self.offers.push(order),
            Side::Buy => self.bids.push(order),
        }

        let events = vec![EngineEvent::Observe {
            event: MarketEvent::OrderAccepted {
                id,
                owner: owner.clone(),
                side,
                price,
                quantity,
                tick: self.tick,
            },
        }];
        (id, events)
    }

    /// Remove an order from the pending interval. Idempotent.
    pub fn cancel(&mut self, id: OrderId) -> Vec<EngineEvent> {
        let found = remove_pending(&mut self.offers, id).or_else(|| remove_pending(&mut self.bids, id));
        let Some(order) = found else {
            return Vec::new();
        };
        debug!(%id, owner = %order.owner, "interval order cancelled");

        vec![
            EngineEvent::Deliver {
                to: order.owner,
                message: WireMessage::Reject {
                    id,
                    reason: RejectReason::Cancelled,
                },
            },
            EngineEvent::Observe {
                event: MarketEvent::OrderRemoved {
                    id,
                    kind: RemovalKind::Cancelled,
                    tick: self.tick,
                },
            },
        ]
    }

    /// End the current interval: advance the clock and clear the market.
    pub fn advance_tick(&mut self) -> Vec<EngineEvent> {
        self.tick += 1;
        self.clear_market()
    }

    /// Uniform-price merit-order auction over the interval's orders.
    fn clear_market(&mut self) -> Vec<EngineEvent> {
        // One empty side means no clearing: discard and keep the last price.
        if self.offers.is_empty() || self.bids.is_empty() {
            self.offers.clear();
            self.bids.clear();
            return Vec::new();
        }

        let mut offers = std::mem::take(&mut self.offers);
        let mut bids = std::mem::take(&mut self.bids);

        // Merit order: cheapest supply first, highest willingness first.
        // Ids break ties, preserving arrival order among equal prices.
        offers.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
        bids.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id)));

        // Total demand is price-blind at this stage.
        let total_demand = bids
            .iter()
            .fold(Quantity::zero(), |acc, b| acc.saturating_add(b.quantity));

        let mut remaining_demand = total_demand;
        let mut clearing_price = Price::zero();
        let mut cleared = Decimal::ZERO;
        let mut supply_awards: BTreeMap<ParticipantId, Decimal> = BTreeMap::new();

        // Walk offers ascending until demand is met or supply runs out; the
        // marginal offer sets the uniform clearing price.
        for offer in &offers {
            if remaining_demand.is_exhausted() {
                break;
            }
            let Some(exchange) = Quantity::min_tradeable(offer.quantity, remaining_demand) else {
                break;
            };
            *supply_awards.entry(offer.owner.clone()).or_default() += exchange;
            remaining_demand.reduce(exchange);
            cleared += exchange;
            clearing_price = offer.price;
        }

        if cleared <= fill_epsilon() {
            return Vec::new();
        }

        // Award bids by price rank against the cleared quantity. No check
        // that the bid price covers the clearing price (see module docs).
        let mut demand_awards: BTreeMap<ParticipantId, Decimal> = BTreeMap::new();
        let mut remaining_cleared = cleared;
        for bid in &bids {
            if remaining_cleared <= fill_epsilon() {
                break;
            }
            let fill = match bid.quantity.as_finite() {
                Some(q) => q.min(remaining_cleared),
                None => remaining_cleared,
            };
            *demand_awards.entry(bid.owner.clone()).or_default() += fill;
            remaining_cleared -= fill;
        }

        debug!(price = %clearing_price, qty = %cleared, tick = self.tick, "auction cleared");

        let mut events = Vec::new();
        for (owner, qty) in supply_awards {
            events.push(EngineEvent::Deliver {
                to: owner,
                message: WireMessage::Award {
                    qty,
                    price: clearing_price,
                    role: MarketRole::Producer,
                },
            });
        }
        for (owner, qty) in demand_awards {
            events.push(EngineEvent::Deliver {
                to: owner,
                message: WireMessage::Award {
                    qty,
                    price: clearing_price,
                    role: MarketRole::Consumer,
                },
            });
        }

        // Clearing price goes to everyone, awarded or not.
        events.push(EngineEvent::Broadcast {
            message: WireMessage::PriceTick {
                price: clearing_price,
            },
        });
        events.push(EngineEvent::Observe {
            event: MarketEvent::BatchCleared {
                price: clearing_price,
                cleared_qty: cleared,
                tick: self.tick,
            },
        });
        events.push(EngineEvent::Observe {
            event: MarketEvent::PriceTick {
                price: clearing_price,
                tick: self.tick,
            },
        });

        events
    }
}

fn remove_pending(list: &mut Vec<BatchOrder>, id: OrderId) -> Option<BatchOrder> {
    let position = list.iter().position(|o| o.id == id)?;
    Some(list.remove(position))
}

fn validate(quantity: Quantity, price: Price) -> Result<(), OrderError> {
    if price.is_negative() {
        return Err(OrderError::InvalidPrice(price.to_string()));
    }
    if !quantity.is_positive() {
        return Err(OrderError::InvalidQuantity(quantity.to_string()));
    }
    Ok(())
}
