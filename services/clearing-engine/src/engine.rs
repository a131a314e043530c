//! Continuous clearing engine
//!
//! Price-time-priority matching: after every accepted submission the book is
//! crossed while the best bid price is at or above the best ask price. The
//! execution price is always the resting ask's limit price. After each
//! matching round the engine broadcasts the last trade price; without a
//! trade the previously broadcast price persists.

use rust_decimal::Decimal;
use tracing::debug;
use types::errors::OrderError;
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;
use types::numeric::{Price, Quantity};
use types::order::{Order, RejectReason, Side};
use types::trade::Trade;

use crate::book::{AskBook, BidBook};
use crate::config::MarketConfig;
use crate::events::{EngineEvent, MarketEvent, RemovalKind};
use crate::matching::crossing;
use crate::store::OrderStore;

/// The continuous-mode market clearing engine.
///
/// Owns the order store and both side books; all access is serialized by the
/// caller (one mailbox, one execution context).
pub struct ContinuousEngine {
    store: OrderStore,
    bids: BidBook,
    asks: AskBook,
    last_price: Price,
    tick: u64,
    ttl: u64,
}

impl ContinuousEngine {
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            store: OrderStore::new(),
            bids: BidBook::new(),
            asks: AskBook::new(),
            last_price: config.initial_price,
            tick: 0,
            ttl: config.order_ttl_ticks,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn last_price(&self) -> Price {
        self.last_price
    }

    /// Live order lookup (introspection; the store stays engine-owned).
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.store.get(id)
    }

    pub fn live_order_count(&self) -> usize {
        self.store.len()
    }

    /// Resting bids in priority order (price descending, id ascending).
    pub fn bid_priority(&self) -> Vec<(Price, OrderId)> {
        self.bids.iter_priority()
    }

    /// Resting asks in priority order (price ascending, id ascending).
    pub fn ask_priority(&self) -> Vec<(Price, OrderId)> {
        self.asks.iter_priority()
    }

    /// Submit an order. Assigns a fresh id, validates, inserts, then crosses
    /// the book. Returns the assigned id and all events the operation
    /// produced, in emission order.
    pub fn submit(
        &mut self,
        owner: &ParticipantId,
        side: Side,
        quantity: Quantity,
        price: Price,
    ) -> (OrderId, Vec<EngineEvent>) {
        let id = self.store.allocate_id();

        if let Err(err) = validate(quantity, price) {
            debug!(%id, %owner, %err, "order rejected at ingestion");
            let events = vec![EngineEvent::Deliver {
                to: owner.clone(),
                message: WireMessage::Reject {
                    id,
                    reason: RejectReason::InvalidPrice,
                },
            }];
            return (id, events);
        }

        let order = Order::new(
            id,
            owner.clone(),
            side,
            quantity,
            price,
            self.tick,
            self.ttl,
        );
        debug!(%id, %owner, %side, %quantity, %price, "new order");

        match side {
            Side::Buy => self.bids.insert(price, id),
            Side::Sell => self.asks.insert(price, id),
        }
        self.store.insert(order);

        let mut events = vec![EngineEvent::Observe {
            event: MarketEvent::OrderAccepted {
                id,
                owner: owner.clone(),
                side,
                price,
                quantity,
                tick: self.tick,
            },
        }];

        self.cross(&mut events);

        events.push(EngineEvent::Broadcast {
            message: WireMessage::PriceTick {
                price: self.last_price,
            },
        });
        events.push(EngineEvent::Observe {
            event: MarketEvent::PriceTick {
                price: self.last_price,
                tick: self.tick,
            },
        });

        (id, events)
    }

    /// Cancel an order by id. Idempotent: unknown or already-terminal ids
    /// are harmless no-ops producing no events.
    pub fn cancel(&mut self, id: OrderId) -> Vec<EngineEvent> {
        let Some(order) = self.store.remove(&id) else {
            return Vec::new();
        };
        match order.side {
            Side::Buy => self.bids.remove(&id, order.price),
            Side::Sell => self.asks.remove(&id, order.price),
        };
        debug!(%id, owner = %order.owner, "order cancelled");

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

    /// Advance the logical clock and sweep expired orders. Runs after all
    /// matching for the previous tick's messages has settled (mailbox
    /// serialization), so an order cannot be matched and expired in the same
    /// boundary.
    pub fn advance_tick(&mut self) -> Vec<EngineEvent> {
        self.tick += 1;
        let mut events = Vec::new();

        for id in self.store.expired_ids(self.tick) {
            let Some(order) = self.store.remove(&id) else {
                continue;
            };
            match order.side {
                Side::Buy => self.bids.remove(&id, order.price),
                Side::Sell => self.asks.remove(&id, order.price),
            };
            debug!(%id, owner = %order.owner, tick = self.tick, "order expired");

            events.push(EngineEvent::Deliver {
                to: order.owner,
                message: WireMessage::Reject {
                    id,
                    reason: RejectReason::Expired,
                },
            });
            events.push(EngineEvent::Observe {
                event: MarketEvent::OrderRemoved {
                    id,
                    kind: RemovalKind::Expired,
                    tick: self.tick,
                },
            });
        }
        events
    }

    /// Cross the book while the best bid price covers the best ask price.
    fn cross(&mut self, events: &mut Vec<EngineEvent>) {
        loop {
            let Some((bid_price, bid_id)) = self.bids.best() else {
                break;
            };
            let Some((ask_price, ask_id)) = self.asks.best() else {
                break;
            };
            if !crossing::can_match(bid_price, ask_price) {
                break;
            }

            let (buyer, bid_qty) = match self.store.get(&bid_id) {
                Some(o) => (o.owner.clone(), o.quantity),
                None => break,
            };
            let (seller, ask_qty) = match self.store.get(&ask_id) {
                Some(o) => (o.owner.clone(), o.quantity),
                None => break,
            };

            // Two unbounded orders define no finite trade quantity; both rest.
            let Some(traded) = Quantity::min_tradeable(bid_qty, ask_qty) else {
                break;
            };

            // Execution price is the resting ask's limit price, never the bid's.
            self.last_price = ask_price;
            debug!(
                %buyer, %seller, qty = %traded, price = %ask_price, "trade"
            );

            events.push(EngineEvent::Deliver {
                to: seller.clone(),
                message: WireMessage::Fill {
                    id: ask_id,
                    qty: traded,
                    price: ask_price,
                    from: buyer.clone(),
                },
            });
            events.push(EngineEvent::Deliver {
                to: buyer.clone(),
                message: WireMessage::Fill {
                    id: bid_id,
                    qty: traded,
                    price: ask_price,
                    from: seller.clone(),
                },
            });
            events.push(EngineEvent::Observe {
                event: MarketEvent::TradeExecuted {
                    trade: Trade {
                        buy_order_id: bid_id,
                        sell_order_id: ask_id,
                        buyer,
                        seller,
                        quantity: traded,
                        price: ask_price,
                        tick: self.tick,
                    },
                },
            });

            self.apply_fill(bid_id, bid_price, Side::Buy, traded, events);
            self.apply_fill(ask_id, ask_price, Side::Sell, traded, events);
        }
    }

    /// Decrement one side of a match, removing the order once exhausted.
    /// A removed order emits no further notifications.
    fn apply_fill(
        &mut self,
        id: OrderId,
        price: Price,
        side: Side,
        traded: Decimal,
        events: &mut Vec<EngineEvent>,
    ) {
        let filled = match self.store.get_mut(&id) {
            Some(order) => {
                order.fill(traded);
                order.is_filled()
            }
            None => return,
        };
        if filled {
            match side {
                Side::Buy => self.bids.remove(&id, price),
                Side::Sell => self.asks.remove(&id, price),
            };
            self.store.remove(&id);
            events.push(EngineEvent::Observe {
                event: MarketEvent::OrderRemoved {
                    id,
                    kind: RemovalKind::Filled,
                    tick: self.tick,
                },
            });
        }
    }
}

fn validate(quantity: Quantity, price: Price) -> Result<(), OrderError> {
    if !price.is_positive() {
        return Err(OrderError::InvalidPrice(price.to_string()));
    }
    if !quantity.is_positive() {
        return Err(OrderError::InvalidQuantity(quantity.to_string()));
    }
    Ok(())
}
