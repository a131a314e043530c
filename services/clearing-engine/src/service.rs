//! Engine actor service
//!
//! The engine is a single logical actor: one task owns the clearing
//! mechanism and drains one inbound mailbox, so every mutation — message
//! handling or scheduled tick — completes fully before the next begins.
//! That serialization is what upholds the price-time-priority invariants.
//!
//! Participants talk wire text (see `types::message`); a malformed message
//! is logged and dropped, affecting only its sender.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use types::ids::{OrderId, ParticipantId};
use types::message::WireMessage;

use crate::batch::BatchEngine;
use crate::config::{ClearingMode, MarketConfig};
use crate::engine::ContinuousEngine;
use crate::events::EngineEvent;
use crate::notify::FanOut;

/// Commands accepted by the engine mailbox.
#[derive(Debug)]
pub enum EngineCommand {
    /// Raw wire content from a participant. `reply`, when present, receives
    /// the id assigned to a SUBMIT (the `submit -> id` contract); all other
    /// content answers `None`.
    Message {
        from: ParticipantId,
        content: String,
        reply: Option<oneshot::Sender<Option<OrderId>>>,
    },
    /// Scheduled logical-clock tick.
    Tick,
}

/// Cheap handle for feeding the engine mailbox.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    /// Fire-and-forget wire message (CANCEL, or SUBMIT when the assigned id
    /// is not needed).
    pub fn send(&self, from: &ParticipantId, content: impl Into<String>) {
        let _ = self.tx.send(EngineCommand::Message {
            from: from.clone(),
            content: content.into(),
            reply: None,
        });
    }

    /// Submit and await the engine-assigned order id. `None` when the
    /// content was not an accepted-for-processing SUBMIT or the engine is
    /// gone.
    pub async fn submit(&self, from: &ParticipantId, content: impl Into<String>) -> Option<OrderId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.tx.send(EngineCommand::Message {
            from: from.clone(),
            content: content.into(),
            reply: Some(reply_tx),
        });
        if sent.is_err() {
            return None;
        }
        reply_rx.await.unwrap_or(None)
    }

    /// Inject a logical-clock tick. Returns false once the engine is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(EngineCommand::Tick).is_ok()
    }
}

/// The deployed clearing mechanism. One per engine instance, never both.
enum Mechanism {
    Continuous(ContinuousEngine),
    Batch(BatchEngine),
}

impl Mechanism {
    fn submit(
        &mut self,
        from: &ParticipantId,
        side: types::order::Side,
        qty: types::numeric::Quantity,
        price: types::numeric::Price,
    ) -> (OrderId, Vec<EngineEvent>) {
        match self {
            Mechanism::Continuous(engine) => engine.submit(from, side, qty, price),
            Mechanism::Batch(engine) => engine.submit(from, side, qty, price),
        }
    }

    fn cancel(&mut self, id: OrderId) -> Vec<EngineEvent> {
        match self {
            Mechanism::Continuous(engine) => engine.cancel(id),
            Mechanism::Batch(engine) => engine.cancel(id),
        }
    }

    fn advance_tick(&mut self) -> Vec<EngineEvent> {
        match self {
            Mechanism::Continuous(engine) => engine.advance_tick(),
            Mechanism::Batch(engine) => engine.advance_tick(),
        }
    }
}

/// The engine actor: mechanism + mailbox + fan-out.
pub struct EngineService {
    mechanism: Mechanism,
    fanout: FanOut,
    rx: mpsc::UnboundedReceiver<EngineCommand>,
}

impl EngineService {
    /// Build the service and its mailbox handle. The fan-out must already
    /// have every participant registered; it moves into the actor.
    pub fn new(config: &MarketConfig, fanout: FanOut) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mechanism = match config.mode {
            ClearingMode::Continuous => Mechanism::Continuous(ContinuousEngine::new(config)),
            ClearingMode::Batch => Mechanism::Batch(BatchEngine::new(config)),
        };
        (
            Self {
                mechanism,
                fanout,
                rx,
            },
            EngineHandle { tx },
        )
    }

    /// Drain the mailbox until every handle is dropped.
    pub async fn run(mut self) {
        info!("clearing engine up");
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        info!("mailbox closed; clearing engine down");
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Tick => {
                let events = self.mechanism.advance_tick();
                self.fanout.dispatch(events);
            }
            EngineCommand::Message {
                from,
                content,
                reply,
            } => {
                let assigned = self.handle_message(&from, &content);
                if let Some(reply) = reply {
                    let _ = reply.send(assigned);
                }
            }
        }
    }

    fn handle_message(&mut self, from: &ParticipantId, content: &str) -> Option<OrderId> {
        match WireMessage::parse(content) {
            Ok(WireMessage::Submit { side, qty, price }) => {
                let (id, events) = self.mechanism.submit(from, side, qty, price);
                self.fanout.dispatch(events);
                Some(id)
            }
            Ok(WireMessage::Cancel { id }) => {
                let events = self.mechanism.cancel(id);
                if events.is_empty() {
                    debug!(%from, %id, "cancel of unknown order ignored");
                }
                self.fanout.dispatch(events);
                None
            }
            Ok(other) => {
                warn!(%from, kind = other.kind(), "unexpected message kind from participant");
                None
            }
            Err(err) => {
                warn!(%from, %err, "malformed message dropped");
                None
            }
        }
    }
}

/// Drive the engine's logical clock from a wall-clock interval. The task
/// ends once the engine mailbox closes.
pub fn spawn_ticker(handle: EngineHandle, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first interval tick fires immediately; skip it so tick 1
        // lands one full period after startup
        interval.tick().await;
        loop {
            interval.tick().await;
            if !handle.tick() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let continuous = MarketConfig::default();
        let (service, _handle) = EngineService::new(&continuous, FanOut::new());
        assert!(matches!(service.mechanism, Mechanism::Continuous(_)));

        let batch = MarketConfig {
            mode: ClearingMode::Batch,
            ..MarketConfig::default()
        };
        let (service, _handle) = EngineService::new(&batch, FanOut::new());
        assert!(matches!(service.mechanism, Mechanism::Batch(_)));
    }
}
