use super::types::{Order, OrderId, Price, Quantity};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// All resting orders at one price, on one side of one market's book.
///
/// Orders are kept in an `IndexMap` so that insertion order (price-time
/// priority's tie-break) survives removals without a re-sort: shifting the
/// map would perturb FIFO order on removal, so callers use
/// `shift_remove`/no removal-without-reinsertion semantics throughout.
#[derive(Debug)]
pub struct PriceLevel {
    pub price: Price,
    orders: IndexMap<OrderId, Order>,
    total_amount: Quantity,
}

#[derive(Debug, thiserror::Error)]
pub enum PriceLevelError {
    #[error("order {0} already present at this price level")]
    AlreadyPresent(OrderId),
    #[error("order {0} not present at this price level")]
    NotPresent(OrderId),
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: IndexMap::new(),
            total_amount: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_amount(&self) -> Quantity {
        self.total_amount
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Orders in FIFO (insertion) order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn insert_order(&mut self, order: Order) -> Result<(), PriceLevelError> {
        if self.orders.contains_key(&order.id) {
            return Err(PriceLevelError::AlreadyPresent(order.id));
        }
        self.total_amount += order.amount();
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn remove_order(&mut self, id: &str) -> Result<Order, PriceLevelError> {
        let order = self
            .orders
            .shift_remove(id)
            .ok_or_else(|| PriceLevelError::NotPresent(id.to_string()))?;
        self.total_amount -= order.amount();
        Ok(order)
    }

    /// Adjusts the level's running total by a signed delta after the order's
    /// own amount has already been mutated by the caller (the matching
    /// engine holds `&Order` references into this level while walking it).
    pub fn change_total(&mut self, delta: Decimal) {
        self.total_amount += delta;
    }
}
