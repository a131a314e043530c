//! Error taxonomy for the market
//!
//! Wire-codec failures and order validation failures are the only error
//! classes the core knows: lifecycle races are no-ops by design and
//! liquidity shortfall is not an error.

use crate::ids::OrderId;
use thiserror::Error;

/// Top-level market error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("order error: {0}")]
    Order(#[from] OrderError),
}

/// Wire-message decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("empty message")]
    Empty,

    #[error("unknown message kind: {0}")]
    UnknownKind(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Order validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("order not found: {0}")]
    NotFound(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::InvalidValue {
            field: "qty",
            value: "ten".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for qty: ten");
    }

    #[test]
    fn test_market_error_from_codec_error() {
        let err: MarketError = CodecError::Empty.into();
        assert!(matches!(err, MarketError::Codec(_)));
    }

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidPrice("-0.01".to_string());
        assert_eq!(err.to_string(), "invalid price: -0.01");
    }
}
