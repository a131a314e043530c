//! Participant simulation for the decentralized energy market
//!
//! Wires independent producer, consumer, storage, and trading tasks to the
//! clearing engine over mailboxes, with deterministic seeded behavior where
//! participants need randomness.
//!
//! # Modules
//! - `participants` — Producer, backup producer, consumer, storage, trader tasks
//! - `metrics` — Market counters aggregated from the observer side channel

pub mod metrics;
pub mod participants;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
