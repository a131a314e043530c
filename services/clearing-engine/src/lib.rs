//! Market Clearing Engine
//!
//! The core of the decentralized energy market: the order book, a
//! continuous price-time-priority matcher, an alternative periodic
//! uniform-price batch clearer, and the shared order lifecycle
//! (submission, partial fill, cancellation, expiry).
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced: price favorability first, then
//!   arrival order (engine-assigned id) among equal prices
//! - Continuous-mode execution price is always the resting ask's price
//! - Exactly one terminal notification per order (fill, cancel, or expiry)
//! - Unbounded orders are never exhausted by matching
//! - All book state is owned by one serialized execution context

pub mod batch;
pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod matching;
pub mod notify;
pub mod service;
pub mod store;

pub use batch::BatchEngine;
pub use config::{ClearingMode, MarketConfig};
pub use engine::ContinuousEngine;
pub use events::{EngineEvent, MarketEvent, RemovalKind};
pub use notify::{Envelope, FanOut};
pub use service::{spawn_ticker, EngineCommand, EngineHandle, EngineService};
