//! Shared helpers for the integration test suite.

use orderflow_core::prelude::*;
use rust_decimal::Decimal;

#[allow(clippy::too_many_arguments, dead_code)]
pub fn make_limit_order(id: &str, side: Side, price: &str, amount: &str, ts: u64) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Limit,
        "trader".to_string(),
        price.parse().unwrap(),
        amount.parse().unwrap(),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        ts,
    )
}

#[allow(clippy::too_many_arguments, dead_code)]
pub fn make_limit_order_with_costs(
    id: &str,
    side: Side,
    price: &str,
    amount: &str,
    gas_fee_amount: &str,
    maker_fee_rate: &str,
    taker_fee_rate: &str,
    ts: u64,
) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Limit,
        "trader".to_string(),
        price.parse().unwrap(),
        amount.parse().unwrap(),
        gas_fee_amount.parse().unwrap(),
        maker_fee_rate.parse().unwrap(),
        taker_fee_rate.parse().unwrap(),
        ts,
    )
}

#[allow(dead_code)]
pub fn make_market_order(id: &str, side: Side, amount: &str, ts: u64) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Market,
        "trader".to_string(),
        Decimal::ZERO,
        amount.parse().unwrap(),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        ts,
    )
}

/// A market order carrying an optional price bound, exercising the
/// "behaves like a limit price if present" rule for market orders.
#[allow(dead_code)]
pub fn make_bounded_market_order(id: &str, side: Side, price: &str, amount: &str, ts: u64) -> Order {
    Order::new(
        id.to_string(),
        "ETH-DAI".to_string(),
        side,
        OrderKind::Market,
        "trader".to_string(),
        price.parse().unwrap(),
        amount.parse().unwrap(),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        ts,
    )
}

#[allow(dead_code)]
pub fn price(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

#[allow(dead_code)]
pub fn qty(raw: &str) -> Decimal {
    raw.parse().unwrap()
}
