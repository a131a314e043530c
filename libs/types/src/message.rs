//! Wire-message codec
//!
//! Message content is a flat set of semicolon-separated `key=value` fields
//! with the `kind` field first, e.g.
//! `kind=SUBMIT;side=buy;qty=10;price=0.05`. The codec is independent of
//! any transport: an envelope carries the sender address, the content is
//! just this string.
//!
//! The unbounded quantity sentinel encodes as `inf` (parsing also accepts
//! `unbounded` and the legacy `Infinity` spelling).

use crate::errors::CodecError;
use crate::ids::{OrderId, ParticipantId};
use crate::numeric::{Price, Quantity};
use crate::order::{MarketRole, RejectReason, Side};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// All message kinds exchanged between participants and the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// participant → engine: place an order
    Submit {
        side: Side,
        qty: Quantity,
        price: Price,
    },
    /// participant → engine: cancel an order by id (idempotent)
    Cancel { id: OrderId },
    /// engine → participant: a match touched this order
    Fill {
        id: OrderId,
        qty: Decimal,
        price: Price,
        from: ParticipantId,
    },
    /// engine → participant: terminal removal without a fill
    Reject { id: OrderId, reason: RejectReason },
    /// engine → all: last trade / clearing price
    PriceTick { price: Price },
    /// engine → participant (batch mode): awarded quantity at the clearing price
    Award {
        qty: Decimal,
        price: Price,
        role: MarketRole,
    },
}

impl WireMessage {
    /// Wire label of the message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Submit { .. } => "SUBMIT",
            WireMessage::Cancel { .. } => "CANCEL",
            WireMessage::Fill { .. } => "FILL",
            WireMessage::Reject { .. } => "REJECT",
            WireMessage::PriceTick { .. } => "PRICE_TICK",
            WireMessage::Award { .. } => "AWARD",
        }
    }

    /// Encode to the `key=value;...` wire form.
    pub fn encode(&self) -> String {
        match self {
            WireMessage::Submit { side, qty, price } => {
                format!("kind=SUBMIT;side={};qty={};price={}", side, qty, price)
            }
            WireMessage::Cancel { id } => format!("kind=CANCEL;id={}", id),
            WireMessage::Fill {
                id,
                qty,
                price,
                from,
            } => format!(
                "kind=FILL;id={};qty={};price={};from={}",
                id, qty, price, from
            ),
            WireMessage::Reject { id, reason } => {
                format!("kind=REJECT;id={};reason={}", id, reason)
            }
            WireMessage::PriceTick { price } => format!("kind=PRICE_TICK;price={}", price),
            WireMessage::Award { qty, price, role } => {
                format!("kind=AWARD;qty={};price={};role={}", qty, price, role)
            }
        }
    }

    /// Parse from the wire form.
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        let fields = Fields::split(input)?;
        let kind = fields.get("kind")?;
        match kind {
            "SUBMIT" => Ok(WireMessage::Submit {
                side: fields.parse_with("side", |v| Side::from_str(v).ok())?,
                qty: fields.parse_with("qty", |v| Quantity::from_str(v).ok())?,
                price: fields.parse_with("price", |v| Price::from_str(v).ok())?,
            }),
            "CANCEL" => Ok(WireMessage::Cancel {
                id: fields.parse_with("id", |v| OrderId::from_str(v).ok())?,
            }),
            "FILL" => Ok(WireMessage::Fill {
                id: fields.parse_with("id", |v| OrderId::from_str(v).ok())?,
                qty: fields.parse_with("qty", |v| Decimal::from_str(v).ok())?,
                price: fields.parse_with("price", |v| Price::from_str(v).ok())?,
                from: ParticipantId::new(fields.get("from")?),
            }),
            "REJECT" => Ok(WireMessage::Reject {
                id: fields.parse_with("id", |v| OrderId::from_str(v).ok())?,
                reason: fields.parse_with("reason", |v| RejectReason::from_str(v).ok())?,
            }),
            "PRICE_TICK" => Ok(WireMessage::PriceTick {
                price: fields.parse_with("price", |v| Price::from_str(v).ok())?,
            }),
            "AWARD" => Ok(WireMessage::Award {
                qty: fields.parse_with("qty", |v| Decimal::from_str(v).ok())?,
                price: fields.parse_with("price", |v| Price::from_str(v).ok())?,
                role: fields.parse_with("role", |v| MarketRole::from_str(v).ok())?,
            }),
            other => Err(CodecError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Split field accessor over one message.
struct Fields<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn split(input: &'a str) -> Result<Self, CodecError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CodecError::Empty);
        }
        let pairs = trimmed
            .split(';')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => (k, v),
                None => (part, ""),
            })
            .collect();
        Ok(Self { pairs })
    }

    fn get(&self, key: &'static str) -> Result<&'a str, CodecError> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or(CodecError::MissingField(key))
    }

    fn parse_with<T>(
        &self,
        key: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, CodecError> {
        let raw = self.get(key)?;
        parse(raw).ok_or_else(|| CodecError::InvalidValue {
            field: key,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_roundtrip() {
        let msg = WireMessage::Submit {
            side: Side::Buy,
            qty: Quantity::finite(Decimal::from(10)),
            price: "0.05".parse().unwrap(),
        };
        let encoded = msg.encode();
        assert_eq!(encoded, "kind=SUBMIT;side=buy;qty=10;price=0.05");
        assert_eq!(WireMessage::parse(&encoded).unwrap(), msg);
    }

    #[test]
    fn test_submit_unbounded_qty() {
        let msg = WireMessage::parse("kind=SUBMIT;side=sell;qty=inf;price=0.11").unwrap();
        match msg {
            WireMessage::Submit { qty, .. } => assert!(qty.is_unbounded()),
            _ => panic!("expected SUBMIT"),
        }
        // legacy feed spelling
        let legacy = WireMessage::parse("kind=SUBMIT;side=sell;qty=Infinity;price=0.11").unwrap();
        match legacy {
            WireMessage::Submit { qty, .. } => assert!(qty.is_unbounded()),
            _ => panic!("expected SUBMIT"),
        }
    }

    #[test]
    fn test_negative_price_parses() {
        // Validation is the engine's job: the codec must carry the value
        // through so the submitter can be notified with a REJECT.
        let msg = WireMessage::parse("kind=SUBMIT;side=buy;qty=1;price=-0.01").unwrap();
        match msg {
            WireMessage::Submit { price, .. } => assert!(price.is_negative()),
            _ => panic!("expected SUBMIT"),
        }
    }

    #[test]
    fn test_cancel_roundtrip() {
        let msg = WireMessage::Cancel { id: OrderId::new(7) };
        assert_eq!(msg.encode(), "kind=CANCEL;id=7");
        assert_eq!(WireMessage::parse("kind=CANCEL;id=7").unwrap(), msg);
    }

    #[test]
    fn test_fill_roundtrip() {
        let msg = WireMessage::Fill {
            id: OrderId::new(3),
            qty: Decimal::from(6),
            price: "0.05".parse().unwrap(),
            from: ParticipantId::new("consumer"),
        };
        let parsed = WireMessage::parse(&msg.encode()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_reject_roundtrip() {
        let msg = WireMessage::Reject {
            id: OrderId::new(9),
            reason: RejectReason::Expired,
        };
        assert_eq!(msg.encode(), "kind=REJECT;id=9;reason=expired");
        assert_eq!(WireMessage::parse(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_award_roundtrip() {
        let msg = WireMessage::Award {
            qty: Decimal::from(5),
            price: "0.05".parse().unwrap(),
            role: MarketRole::Producer,
        };
        assert_eq!(msg.encode(), "kind=AWARD;qty=5;price=0.05;role=producer");
        assert_eq!(WireMessage::parse(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(WireMessage::parse("  "), Err(CodecError::Empty));
        assert_eq!(
            WireMessage::parse("kind=NEGOTIATE;id=1"),
            Err(CodecError::UnknownKind("NEGOTIATE".to_string()))
        );
        assert_eq!(
            WireMessage::parse("kind=CANCEL"),
            Err(CodecError::MissingField("id"))
        );
        assert_eq!(
            WireMessage::parse("kind=CANCEL;id=seven"),
            Err(CodecError::InvalidValue {
                field: "id",
                value: "seven".to_string()
            })
        );
        assert_eq!(
            WireMessage::parse("kind=SUBMIT;side=hold;qty=1;price=0.05"),
            Err(CodecError::InvalidValue {
                field: "side",
                value: "hold".to_string()
            })
        );
    }

    #[test]
    fn test_field_order_is_irrelevant() {
        let msg = WireMessage::parse("kind=SUBMIT;price=0.05;side=sell;qty=4").unwrap();
        assert_eq!(
            msg,
            WireMessage::Submit {
                side: Side::Sell,
                qty: Quantity::finite(Decimal::from(4)),
                price: "0.05".parse().unwrap(),
            }
        );
    }
}
