//! Market participant tasks
//!
//! Each participant is one schedulable task with its own inbound mailbox;
//! all coordination with the engine is by message passing. Decision logic
//! lives in plain structs (`on_message` + `next_cycle`) so it can be tested
//! without a runtime; the `run` functions are thin interval-driven drivers.
//!
//! The bidding policies are deliberately simple black boxes: they exist to
//! exercise the engine, not to model good strategy.

pub mod backup;
pub mod consumer;
pub mod producer;
pub mod storage;
pub mod trader;

use clearing_engine::Envelope;
use tokio::sync::mpsc;
use tracing::warn;
use types::message::WireMessage;

/// Drain everything currently in a mailbox without blocking.
pub fn drain_mailbox(inbox: &mut mpsc::UnboundedReceiver<Envelope>) -> Vec<WireMessage> {
    let mut messages = Vec::new();
    while let Ok(envelope) = inbox.try_recv() {
        match WireMessage::parse(&envelope.content) {
            Ok(message) => messages.push(message),
            Err(err) => warn!(from = %envelope.from, %err, "unreadable engine message"),
        }
    }
    messages
}
