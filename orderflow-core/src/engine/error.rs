use super::types::{MarketId, OrderId};
use thiserror::Error;

/// Errors raised by `OrderBook` mutating operations.
///
/// These surface up to the dispatcher, which logs and continues rather than
/// unwinding: a single bad event must not take down every other market.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("order {0} already present in the book")]
    AlreadyPresent(OrderId),

    #[error("order {0} not found in market {1}")]
    NotFound(OrderId, MarketId),

    #[error("market {0} is not open")]
    UnknownMarket(MarketId),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("price level invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<super::price_level::PriceLevelError> for EngineError {
    fn from(err: super::price_level::PriceLevelError) -> Self {
        EngineError::InvariantViolation(err.to_string())
    }
}
