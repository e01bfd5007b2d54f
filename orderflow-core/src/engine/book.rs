use super::error::EngineError;
use super::observer::BookObserver;
use super::price_level::PriceLevel;
use super::types::{MarketId, Order, OrderId, Price, Side};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time view of a book, dense arrays of `(price, total_amount)`
/// per level, best-first on each side.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub sequence: u64,
    pub bids: Vec<(Price, Decimal)>,
    pub asks: Vec<(Price, Decimal)>,
}

/// The per-market order book: two price-ordered collections of `PriceLevel`,
/// a fast order-id index, and a monotonic sequence counter.
///
/// Only the market's own `MarketHandler`/`MatchingEngine` mutate a book;
/// `snapshot` may run concurrently with that from any thread, since it only
/// takes read locks.
pub struct DefaultOrderBook {
    market_id: MarketId,
    bids: RwLock<BTreeMap<Price, PriceLevel>>,
    asks: RwLock<BTreeMap<Price, PriceLevel>>,
    order_index: DashMap<OrderId, (Side, Price)>,
    sequence: AtomicU64,
    observers: Vec<Arc<dyn BookObserver>>,
}

impl DefaultOrderBook {
    pub fn new(market_id: MarketId, observers: Vec<Arc<dyn BookObserver>>) -> Self {
        Self {
            market_id,
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
            order_index: DashMap::new(),
            sequence: AtomicU64::new(0),
            observers,
        }
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    fn bump_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn side_levels(&self, side: Side) -> &RwLock<BTreeMap<Price, PriceLevel>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Inserts a brand-new resting order. Fails if the id is already known.
    pub fn insert(&self, order: Order) -> Result<(), EngineError> {
        if self.order_index.contains_key(&order.id) {
            return Err(EngineError::AlreadyPresent(order.id));
        }
        let side = order.side;
        let price = order.price;
        let id = order.id.clone();
        self.order_index.insert(id.clone(), (side, price));
        {
            let mut levels = self.side_levels(side).write();
            let level = levels.entry(price).or_insert_with(|| PriceLevel::new(price));
            level.insert_order(order)?;
            let inserted = level.get(&id).expect("just inserted");
            let sequence = self.bump_sequence();
            self.notify_insert(sequence, inserted);
        }
        Ok(())
    }

    /// Removes a resting order by id. Non-fatal if absent (callers treat
    /// `NotFound` as a no-op cancel).
    pub fn remove(&self, order_id: &str) -> Result<Order, EngineError> {
        let (side, price) = self
            .order_index
            .remove(order_id)
            .map(|(_, v)| v)
            .ok_or_else(|| EngineError::NotFound(order_id.to_string(), self.market_id.clone()))?;
        let removed = {
            let mut levels = self.side_levels(side).write();
            let level = levels
                .get_mut(&price)
                .ok_or_else(|| EngineError::NotFound(order_id.to_string(), self.market_id.clone()))?;
            let removed = level.remove_order(order_id)?;
            if level.is_empty() {
                levels.remove(&price);
            }
            removed
        };
        let sequence = self.bump_sequence();
        let removed_amount = removed.amount();
        self.notify_remove(sequence, &removed, removed_amount);
        Ok(removed)
    }

    /// Adjusts a resting order's amount by a signed delta. Fails if the
    /// result would be non-positive: callers must `remove` instead of
    /// zeroing an order out via `change`.
    pub fn change(&self, order_id: &str, delta: Decimal) -> Result<Decimal, EngineError> {
        let (side, price) = self
            .order_index
            .get(order_id)
            .map(|e| *e)
            .ok_or_else(|| EngineError::NotFound(order_id.to_string(), self.market_id.clone()))?;
        let (new_amount, cloned) = {
            let mut levels = self.side_levels(side).write();
            let level = levels
                .get_mut(&price)
                .ok_or_else(|| EngineError::NotFound(order_id.to_string(), self.market_id.clone()))?;
            let order = level
                .get(order_id)
                .ok_or_else(|| EngineError::NotFound(order_id.to_string(), self.market_id.clone()))?;
            let new_amount = order.amount() + delta;
            if new_amount <= Decimal::ZERO {
                return Err(EngineError::InvariantViolation(format!(
                    "change on {order_id} would leave amount {new_amount} <= 0; remove instead"
                )));
            }
            order.set_amount(new_amount);
            level.change_total(delta);
            (new_amount, order.clone())
        };
        let sequence = self.bump_sequence();
        self.notify_change(sequence, &cloned, delta);
        Ok(new_amount)
    }

    /// Current resting amount of a live order, or `None` if absent.
    pub(crate) fn order_amount(&self, order_id: &str) -> Option<Decimal> {
        let (side, price) = *self.order_index.get(order_id)?;
        let levels = self.side_levels(side).read();
        levels.get(&price)?.get(order_id).map(|order| order.amount())
    }

    /// Overrides the sequence counter directly. Used only by downstream
    /// replicas, which must track the authoritative sequence carried on the
    /// wire rather than one locally incremented per synthetic mutation.
    pub(crate) fn set_sequence(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::Release);
    }

    pub fn best_price(&self, side: Side) -> Option<Price> {
        let levels = self.side_levels(side).read();
        match side {
            Side::Buy => levels.keys().next_back().copied(),
            Side::Sell => levels.keys().next().copied(),
        }
    }

    pub fn can_match(&self, side: Side, bound: Option<Price>) -> bool {
        match self.best_price(side.opposite()) {
            None => false,
            Some(best) => match bound {
                None => true,
                Some(bound) => match side {
                    Side::Buy => bound >= best,
                    Side::Sell => bound <= best,
                },
            },
        }
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let bids = self.bids.read();
        let asks = self.asks.read();
        BookSnapshot {
            sequence: self.sequence(),
            bids: bids
                .iter()
                .rev()
                .map(|(price, level)| (*price, level.total_amount()))
                .collect(),
            asks: asks
                .iter()
                .map(|(price, level)| (*price, level.total_amount()))
                .collect(),
        }
    }

    /// Locks the given side's levels for matching. Used only by
    /// `MatchingEngine`, which walks and mutates levels directly and is
    /// responsible for sequence bumps and observer notification per
    /// committed change (see `engine::matching`).
    pub(crate) fn levels_write(&self, side: Side) -> parking_lot::RwLockWriteGuard<'_, BTreeMap<Price, PriceLevel>> {
        self.side_levels(side).write()
    }

    /// Read-only access for the pure matching pass (`MatchingEngine::match_order`),
    /// which must not mutate the book before dust-cancellation has run.
    pub(crate) fn levels_read(&self, side: Side) -> parking_lot::RwLockReadGuard<'_, BTreeMap<Price, PriceLevel>> {
        self.side_levels(side).read()
    }

    pub(crate) fn order_index(&self) -> &DashMap<OrderId, (Side, Price)> {
        &self.order_index
    }

    pub(crate) fn observers(&self) -> &[Arc<dyn BookObserver>] {
        &self.observers
    }

    pub(crate) fn notify_insert(&self, sequence: u64, order: &Order) {
        for observer in &self.observers {
            observer.on_insert(sequence, order);
        }
    }

    pub(crate) fn notify_change(&self, sequence: u64, order: &Order, delta: Decimal) {
        for observer in &self.observers {
            observer.on_change(sequence, order, delta);
        }
    }

    pub(crate) fn notify_remove(&self, sequence: u64, order: &Order, removed_amount: Decimal) {
        for observer in &self.observers {
            observer.on_remove(sequence, order, removed_amount);
        }
    }

    pub(crate) fn bump_sequence_pub(&self) -> u64 {
        self.bump_sequence()
    }
}
