//! The downstream, read-only Level-2 replica a market channel keeps
//! current from a snapshot plus a sequenced update stream (§4.5).
//!
//! Reuses `DefaultOrderBook`/`Order` as the aggregation structure: each
//! price level is represented by one synthetic order whose id encodes its
//! side and price, matching the spec's "one synthetic id per price level"
//! wording and letting the replica piggyback on the book's own ordered
//! collections, snapshot projection, and insert/remove machinery instead of
//! reimplementing them.

use crate::engine::book::{BookSnapshot, DefaultOrderBook};
use crate::engine::types::{MarketId, Order, OrderKind, Price, Quantity, Side};
use crate::wire::SnapshotV2;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error(
        "replica desync: update at sequence {sequence} carries a non-positive change {delta} \
         for {side:?}@{price}, which the replica has never seen"
    )]
    Desync {
        sequence: u64,
        side: Side,
        price: Price,
        delta: Decimal,
    },
}

fn synthetic_id(side: Side, price: Price) -> String {
    match side {
        Side::Buy => format!("buy-{price}"),
        Side::Sell => format!("sell-{price}"),
    }
}

fn synthetic_order(market_id: &str, side: Side, price: Price, amount: Quantity) -> Order {
    Order::new(
        synthetic_id(side, price),
        market_id.to_string(),
        side,
        OrderKind::Limit,
        "replica".to_string(),
        price,
        amount,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        0,
    )
}

/// A Level-2 replica, initialized from one snapshot and kept current by
/// applying in-order, sequence-tagged updates.
pub struct OrderbookReplica {
    market_id: MarketId,
    book: DefaultOrderBook,
}

impl OrderbookReplica {
    /// Builds a replica from a point-in-time snapshot: one synthetic order
    /// per level, and the replica's sequence set to the snapshot's.
    pub fn from_snapshot(market_id: MarketId, snapshot: SnapshotV2) -> Self {
        let book = DefaultOrderBook::new(market_id.clone(), Vec::new());
        for (price, amount) in &snapshot.bids {
            book.insert(synthetic_order(&market_id, Side::Buy, *price, *amount))
                .expect("snapshot carries no duplicate price per side");
        }
        for (price, amount) in &snapshot.asks {
            book.insert(synthetic_order(&market_id, Side::Sell, *price, *amount))
                .expect("snapshot carries no duplicate price per side");
        }
        // Initializing via `insert` bumps the book's own sequence once per
        // level; only the snapshot's own sequence is authoritative.
        book.set_sequence(snapshot.sequence);
        Self { market_id, book }
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn sequence(&self) -> u64 {
        self.book.sequence()
    }

    /// Applies one level-2 update. Updates at or below the replica's
    /// current sequence are already reflected and are silently dropped.
    pub fn apply_update(&mut self, sequence: u64, side: Side, price: Price, delta: Quantity) -> Result<(), ReplicaError> {
        if sequence <= self.sequence() {
            return Ok(());
        }
        let id = synthetic_id(side, price);
        match self.book.order_amount(&id) {
            Some(existing) => {
                let new_amount = existing + delta;
                if new_amount <= Decimal::ZERO {
                    self.book
                        .remove(&id)
                        .expect("level present per the order_amount lookup above");
                } else {
                    self.book
                        .change(&id, delta)
                        .expect("result checked positive above");
                }
            }
            None => {
                if delta <= Decimal::ZERO {
                    return Err(ReplicaError::Desync {
                        sequence,
                        side,
                        price,
                        delta,
                    });
                }
                self.book
                    .insert(synthetic_order(&self.market_id, side, price, delta))
                    .expect("absent per the order_amount lookup above");
            }
        }
        self.book.set_sequence(sequence);
        Ok(())
    }

    /// The level's current total amount, if it has any resting amount.
    pub fn level_amount(&self, side: Side, price: Price) -> Option<Decimal> {
        self.book.order_amount(&synthetic_id(side, price))
    }

    /// Current `(bids, asks)` projection, suitable for a fresh subscriber.
    pub fn projection(&self) -> BookSnapshot {
        self.book.snapshot()
    }
}
