use super::types::Order;
use rust_decimal::Decimal;

/// Observes committed mutations of an `OrderBook`.
///
/// Observers run synchronously, after the mutation is already committed to
/// the book, so a panicking observer cannot corrupt book state. The book
/// itself owns sequence advancement (one per call below); observers are for
/// downstream fanout only (activity messages, persistence) and must not be
/// relied on for consistency.
pub trait BookObserver: Send + Sync {
    /// A new order was added to a level. `sequence` is the book's sequence
    /// number after this mutation was committed.
    fn on_insert(&self, _sequence: u64, _order: &Order) {}
    /// An order was fully removed from its level (cancel, full fill, or
    /// failed economic-viability check). `removed_amount` is what it held
    /// just before removal.
    fn on_remove(&self, _sequence: u64, _order: &Order, _removed_amount: Decimal) {}
    /// An order's resting amount changed in place (partial fill) without
    /// being removed. `delta` is negative for a reduction.
    fn on_change(&self, _sequence: u64, _order: &Order, _delta: Decimal) {}
}

/// No-op observer, useful in tests and for markets with no registered sinks.
pub struct NullObserver;

impl BookObserver for NullObserver {}
