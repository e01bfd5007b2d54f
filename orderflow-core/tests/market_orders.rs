mod common;

use crate::common::*;
use orderflow_core::prelude::*;

fn handler() -> MarketHandler {
    MarketHandler::new("ETH-DAI".to_string(), 8, vec![])
}

#[test]
fn market_sell_consumes_bids_like_a_limit_order_by_quantity() {
    let handler = handler();
    let mut bid1 = make_limit_order("bid1", Side::Buy, "1.3", "2", 1);
    let mut bid2 = make_limit_order("bid2", Side::Buy, "1.2", "2", 2);
    handler.handle_new_order(&mut bid1).unwrap();
    handler.handle_new_order(&mut bid2).unwrap();

    let mut taker = make_market_order("t1", Side::Sell, "3", 3);
    let (result, admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();

    assert_eq!(result.match_items.len(), 2);
    assert_eq!(result.match_items[0].maker_id, "bid1");
    assert_eq!(result.match_items[0].matched_amount, qty("2"));
    assert_eq!(result.match_items[1].matched_amount, qty("1"));
    assert!(!admitted, "a market order never rests");
    assert_eq!(handler.book().snapshot().bids, vec![(price("1.2"), qty("1"))]);
    assert_eq!(taker.status(), OrderStatus::Filled);
}

#[test]
fn market_buy_amount_is_a_quote_budget_consumed_best_price_first() {
    let handler = handler();
    let mut ask1 = make_limit_order("ask1", Side::Sell, "2", "3", 1);
    let mut ask2 = make_limit_order("ask2", Side::Sell, "3", "3", 2);
    handler.handle_new_order(&mut ask1).unwrap();
    handler.handle_new_order(&mut ask2).unwrap();

    // Budget of 9 buys all of ask1 (cost 6) and a third of ask2 (cost 3 -> 1 unit).
    let mut taker = make_market_order("t1", Side::Buy, "9", 3);
    let (result, _admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();

    assert_eq!(result.match_items.len(), 2);
    assert_eq!(result.match_items[0].maker_id, "ask1");
    assert_eq!(result.match_items[0].matched_amount, qty("3"));
    assert_eq!(result.match_items[1].maker_id, "ask2");
    assert_eq!(result.match_items[1].matched_amount, qty("1"));
    assert_eq!(taker.status(), OrderStatus::Filled);
}

#[test]
fn market_buy_partial_fill_rounds_the_affordable_amount_down() {
    let handler = handler();
    let mut ask = make_limit_order("ask1", Side::Sell, "3", "100", 1);
    handler.handle_new_order(&mut ask).unwrap();

    // 10 / 3 = 3.333...; rounded down to market_amount_decimals=8.
    let mut taker = make_market_order("t1", Side::Buy, "10", 2);
    let (result, _admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();

    assert_eq!(result.match_items.len(), 1);
    assert_eq!(result.match_items[0].matched_amount, qty("3.33333333"));
    assert_eq!(taker.status(), OrderStatus::PartiallyFilled);
}

#[test]
fn market_order_against_an_empty_opposing_side_has_no_match() {
    let handler = handler();
    let mut taker = make_market_order("t1", Side::Buy, "10", 1);
    let (result, admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();
    assert!(!result.has_match());
    assert!(!admitted);
    assert_eq!(taker.status(), OrderStatus::Pending);
}

#[test]
fn market_order_never_rests_even_with_leftover_amount() {
    let handler = handler();
    let mut ask = make_limit_order("ask1", Side::Sell, "100", "1", 1);
    handler.handle_new_order(&mut ask).unwrap();

    let mut taker = make_market_order("t1", Side::Buy, "1000", 2);
    let (_result, admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();
    assert!(!admitted);
    assert!(handler.book().snapshot().bids.is_empty());
}

#[test]
fn bounded_market_order_that_fails_to_cross_rests_like_a_limit_order() {
    let handler = handler();
    let mut bid = make_limit_order("bid1", Side::Buy, "1.2", "5", 1);
    handler.handle_new_order(&mut bid).unwrap();

    // A market sell bounded at 2.0 does not cross a best bid of 1.2, so it
    // matches nothing and rests as an ask at its bound price, exactly as a
    // limit sell at 2.0 would.
    let mut taker = make_bounded_market_order("t1", Side::Sell, "2.0", "3", 2);
    let (result, admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();

    assert!(!result.has_match());
    assert!(admitted, "a bounded market order with viable leftover rests");
    assert_eq!(handler.book().snapshot().asks, vec![(price("2.0"), qty("3"))]);
    assert_eq!(handler.book().snapshot().bids, vec![(price("1.2"), qty("5"))]);
}

#[test]
fn bounded_market_order_that_crosses_matches_at_the_maker_price_not_its_own_bound() {
    let handler = handler();
    let mut ask = make_limit_order("ask1", Side::Sell, "1.0", "3", 1);
    handler.handle_new_order(&mut ask).unwrap();

    // A market buy bounded at 2.0 crosses the 1.0 ask; matching still
    // happens at the resting maker's price.
    let mut taker = make_bounded_market_order("t1", Side::Buy, "2.0", "3", 2);
    let (result, _admitted, _activities) = handler.handle_new_order(&mut taker).unwrap();

    assert_eq!(result.match_items.len(), 1);
    assert_eq!(result.match_items[0].price, price("1.0"));
    assert!(handler.book().snapshot().asks.is_empty());
}
