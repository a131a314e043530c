//! Notification fan-out
//!
//! Delivers engine output: directed wire messages into per-participant
//! mailboxes (ordered, each mailbox an unbounded mpsc so the engine never
//! blocks on a slow recipient), broadcasts to every registered participant,
//! and typed events onto the observer side channel consumed by the
//! dashboard. A dead mailbox is logged and skipped; it never stalls the
//! engine.

use std::collections::BTreeMap;

use tokio::sync::{broadcast, mpsc};
use tracing::warn;
use types::ids::ParticipantId;
use types::message::WireMessage;

use crate::events::{EngineEvent, MarketEvent};

/// Observer channel capacity; lagging observers lose old events, which is
/// acceptable for the observability side channel only.
const OBSERVER_CAPACITY: usize = 1024;

/// A message as it lands in a participant's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub from: ParticipantId,
    pub content: String,
}

/// Routes engine events to participant mailboxes and observers.
pub struct FanOut {
    participants: BTreeMap<ParticipantId, mpsc::UnboundedSender<Envelope>>,
    observers: broadcast::Sender<MarketEvent>,
    source: ParticipantId,
}

impl FanOut {
    pub fn new() -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            participants: BTreeMap::new(),
            observers,
            source: ParticipantId::new("engine"),
        }
    }

    /// Register a participant mailbox, returning its receiving half.
    pub fn register(&mut self, id: &ParticipantId) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.participants.insert(id.clone(), tx);
        rx
    }

    /// Subscribe to the observer side channel.
    pub fn observe(&self) -> broadcast::Receiver<MarketEvent> {
        self.observers.subscribe()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Dispatch one operation's events in emission order.
    pub fn dispatch(&self, events: Vec<EngineEvent>) {
        for event in events {
            match event {
                EngineEvent::Deliver { to, message } => self.deliver(&to, &message),
                EngineEvent::Broadcast { message } => {
                    for to in self.participants.keys() {
                        self.deliver(to, &message);
                    }
                }
                EngineEvent::Observe { event } => {
                    // no observers subscribed is fine
                    let _ = self.observers.send(event);
                }
            }
        }
    }

    fn deliver(&self, to: &ParticipantId, message: &WireMessage) {
        match self.participants.get(to) {
            Some(tx) => {
                let envelope = Envelope {
                    from: self.source.clone(),
                    content: message.encode(),
                };
                if tx.send(envelope).is_err() {
                    warn!(%to, kind = message.kind(), "mailbox closed; dropping message");
                }
            }
            None => warn!(%to, kind = message.kind(), "no mailbox registered"),
        }
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RemovalKind;
    use types::ids::OrderId;
    use types::order::RejectReason;

    fn reject(id: u64) -> WireMessage {
        WireMessage::Reject {
            id: OrderId::new(id),
            reason: RejectReason::Cancelled,
        }
    }

    #[test]
    fn test_directed_delivery_preserves_order() {
        let mut fanout = FanOut::new();
        let trader = ParticipantId::new("trader");
        let mut inbox = fanout.register(&trader);

        fanout.dispatch(vec![
            EngineEvent::Deliver {
                to: trader.clone(),
                message: reject(1),
            },
            EngineEvent::Deliver {
                to: trader.clone(),
                message: reject(2),
            },
        ]);

        let first = inbox.try_recv().unwrap();
        let second = inbox.try_recv().unwrap();
        assert_eq!(first.from.as_str(), "engine");
        assert!(first.content.contains("id=1"));
        assert!(second.content.contains("id=2"));
        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_all_participants() {
        let mut fanout = FanOut::new();
        let a = ParticipantId::new("a");
        let b = ParticipantId::new("b");
        let mut inbox_a = fanout.register(&a);
        let mut inbox_b = fanout.register(&b);

        fanout.dispatch(vec![EngineEvent::Broadcast {
            message: WireMessage::PriceTick {
                price: "0.05".parse().unwrap(),
            },
        }]);

        assert!(inbox_a.try_recv().unwrap().content.contains("PRICE_TICK"));
        assert!(inbox_b.try_recv().unwrap().content.contains("PRICE_TICK"));
    }

    #[test]
    fn test_observer_side_channel() {
        let fanout = FanOut::new();
        let mut observer = fanout.observe();

        let event = MarketEvent::OrderRemoved {
            id: OrderId::new(5),
            kind: RemovalKind::Expired,
            tick: 3,
        };
        fanout.dispatch(vec![EngineEvent::Observe {
            event: event.clone(),
        }]);

        assert_eq!(observer.try_recv().unwrap(), event);
    }

    #[test]
    fn test_closed_mailbox_does_not_panic() {
        let mut fanout = FanOut::new();
        let gone = ParticipantId::new("gone");
        drop(fanout.register(&gone));

        fanout.dispatch(vec![EngineEvent::Deliver {
            to: gone,
            message: reject(1),
        }]);
    }

    #[test]
    fn test_unregistered_recipient_is_skipped() {
        let fanout = FanOut::new();
        fanout.dispatch(vec![EngineEvent::Deliver {
            to: ParticipantId::new("nobody"),
            message: reject(1),
        }]);
    }
}
