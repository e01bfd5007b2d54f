mod common;

use crate::common::*;
use orderflow_core::prelude::*;

fn book() -> DefaultOrderBook {
    DefaultOrderBook::new("ETH-DAI".to_string(), vec![])
}

#[test]
fn change_reduces_a_resting_order_amount_and_the_level_total() {
    let book = book();
    book.insert(make_limit_order("o1", Side::Buy, "100", "10", 1000)).unwrap();

    let new_amount = book.change("o1", -qty("4")).unwrap();
    assert_eq!(new_amount, qty("6"));
    assert_eq!(book.snapshot().bids, vec![(price("100"), qty("6"))]);
}

#[test]
fn change_that_would_leave_a_non_positive_amount_is_rejected() {
    let book = book();
    book.insert(make_limit_order("o1", Side::Buy, "100", "10", 1000)).unwrap();

    let result = book.change("o1", -qty("10"));
    assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    // The order is untouched: callers must `remove` instead.
    assert_eq!(book.snapshot().bids, vec![(price("100"), qty("10"))]);
}

#[test]
fn change_on_an_unknown_order_is_not_found() {
    let book = book();
    let result = book.change("missing", qty("1"));
    assert!(matches!(result, Err(EngineError::NotFound(_, _))));
}

#[test]
fn cancel_a_nonexistent_order_is_not_found_not_a_panic() {
    let book = book();
    assert!(matches!(book.remove("missing"), Err(EngineError::NotFound(_, _))));
}

#[test]
fn inserting_a_duplicate_id_is_rejected_without_disturbing_the_original() {
    let book = book();
    book.insert(make_limit_order("o1", Side::Buy, "100", "10", 1000)).unwrap();
    let result = book.insert(make_limit_order("o1", Side::Buy, "101", "5", 1001));
    assert!(matches!(result, Err(EngineError::AlreadyPresent(_))));
    assert_eq!(book.snapshot().bids, vec![(price("100"), qty("10"))]);
}

#[test]
fn change_bumps_the_books_sequence_once() {
    let book = book();
    book.insert(make_limit_order("o1", Side::Buy, "100", "10", 1000)).unwrap();
    let before = book.sequence();
    book.change("o1", -qty("1")).unwrap();
    assert_eq!(book.sequence(), before + 1);
}

#[test]
fn relisting_a_cancelled_order_id_is_allowed() {
    let book = book();
    book.insert(make_limit_order("o1", Side::Buy, "100", "10", 1000)).unwrap();
    book.remove("o1").unwrap();
    book.insert(make_limit_order("o1", Side::Buy, "105", "5", 1001)).unwrap();
    assert_eq!(book.snapshot().bids, vec![(price("105"), qty("5"))]);
}
