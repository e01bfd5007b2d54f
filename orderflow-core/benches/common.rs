use orderflow_core::prelude::*;
use rust_decimal::Decimal;

/// Quickly generate a simple limit order for benchmarking
#[allow(dead_code)]
pub fn make_limit_order(id: u64, side: Side, price: u64, amount: u64, ts: u64) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Limit,
        "trader".to_string(),
        Decimal::from(price),
        Decimal::from(amount),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        ts,
    )
}

/// Quickly generate a market order for benchmarking
#[allow(dead_code)]
pub fn make_market_order(id: u64, side: Side, amount: u64, ts: u64) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Market,
        "trader".to_string(),
        Decimal::ZERO,
        Decimal::from(amount),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        ts,
    )
}
