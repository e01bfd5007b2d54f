use mimalloc::MiMalloc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};

/// Global allocator
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// OrderId is the type used for order identifiers on the wire and in the book.
pub type OrderId = String;

/// MarketId is the `BASE-QUOTE` pair identifying one order book, e.g. `"ETH-DAI"`.
pub type MarketId = String;

/// Price and Quantity are arbitrary-precision base-10 decimals.
///
/// Prices are always non-negative; quantities are strictly positive while an
/// order is live on the book.
pub type Price = Decimal;
pub type Quantity = Decimal;

/// Splits a market id of the form `BASE-QUOTE` into its two token symbols.
pub fn split_market_id(market_id: &str) -> Option<(&str, &str)> {
    market_id.split_once('-')
}

pub fn base_token_symbol(market_id: &str) -> Option<&str> {
    split_market_id(market_id).map(|(base, _)| base)
}

pub fn quote_token_symbol(market_id: &str) -> Option<&str> {
    split_market_id(market_id).map(|(_, quote)| quote)
}

/// Side indicates the direction of the order.
#[derive(PartialEq, Eq, Default, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// OrderKind determines how the order is executed against the book.
///
/// A limit order rests on the book if not fully consumed. A market order
/// never rests: for Buy, `amount` is a quote-currency budget; for Sell,
/// `amount` is a base-currency quantity, exactly as for a limit order.
#[derive(PartialEq, Eq, Default, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    #[default]
    Limit,
    Market,
}

/// OrderStatus represents the current status of an order during its lifecycle.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Placed,
    Filled,
    PartiallyFilled,
    Cancelled,
}

/// Coordinates safe concurrent access between the matching thread (which owns
/// the book for the order's market) and a cancel arriving from a different
/// producer event in the same queue.
///
/// Transitions: `Active` -> `Matched` (matching claims it), `Active` ->
/// `Finished` (cancel removes it), `Matched` -> `Finished` (match completes
/// it). There is no path back from `Finished`.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
pub enum OrderLifecycle {
    #[default]
    Active = 0,
    Matched = 1,
    Finished = 2,
}

impl From<u8> for OrderLifecycle {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::Active,
            1 => Self::Matched,
            2 => Self::Finished,
            _ => unreachable!("invalid lifecycle state"),
        }
    }
}

impl From<OrderLifecycle> for u8 {
    fn from(l: OrderLifecycle) -> u8 {
        l as u8
    }
}

/// `Order` is a single resting or incoming order.
///
/// `amount` and `gas_fee_amount` are wrapped in `UnsafeCell` because the
/// matching engine mutates them in place on a maker order that is shared by
/// reference while walking a price level; all such mutation happens on the
/// single thread that owns the order's market (see the dispatcher's
/// per-market actor), so the `Sync` impl below is sound under that
/// discipline and would not be under any other.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,
    pub side: Side,
    pub kind: OrderKind,
    pub trader: String,
    pub price: Price,
    pub lifecycle: AtomicU8,
    amount: UnsafeCell<Quantity>,
    gas_fee_amount: UnsafeCell<Quantity>,
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
    status: UnsafeCell<OrderStatus>,
    pub created_at: u64,
    pub updated_at: u64,
}

unsafe impl Sync for Order {}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            market_id: self.market_id.clone(),
            side: self.side,
            kind: self.kind,
            trader: self.trader.clone(),
            price: self.price,
            lifecycle: AtomicU8::new(self.lifecycle.load(Ordering::Acquire)),
            amount: UnsafeCell::new(self.amount()),
            gas_fee_amount: UnsafeCell::new(self.gas_fee_amount()),
            maker_fee_rate: self.maker_fee_rate,
            taker_fee_rate: self.taker_fee_rate,
            status: UnsafeCell::new(self.status()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        market_id: MarketId,
        side: Side,
        kind: OrderKind,
        trader: String,
        price: Price,
        amount: Quantity,
        gas_fee_amount: Quantity,
        maker_fee_rate: Decimal,
        taker_fee_rate: Decimal,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            market_id,
            side,
            kind,
            trader,
            price,
            lifecycle: AtomicU8::new(OrderLifecycle::Active.into()),
            amount: UnsafeCell::new(amount),
            gas_fee_amount: UnsafeCell::new(gas_fee_amount),
            maker_fee_rate,
            taker_fee_rate,
            status: UnsafeCell::new(OrderStatus::Pending),
            created_at,
            updated_at: created_at,
        }
    }

    #[inline(always)]
    pub fn amount(&self) -> Quantity {
        unsafe { *self.amount.get() }
    }

    #[inline(always)]
    pub fn gas_fee_amount(&self) -> Quantity {
        unsafe { *self.gas_fee_amount.get() }
    }

    #[inline(always)]
    pub fn status(&self) -> OrderStatus {
        unsafe { *self.status.get() }
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        matches!(self.status(), OrderStatus::Filled | OrderStatus::Cancelled)
    }

    /// SAFETY: only the market's matching thread ever calls this on a shared
    /// `&Order`.
    #[inline(always)]
    pub(crate) fn reduce_amount(&self, traded: Quantity) {
        unsafe {
            *self.amount.get() -= traded;
        }
        self.update_status(if self.amount().is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        });
    }

    #[inline(always)]
    pub(crate) fn set_amount(&self, amount: Quantity) {
        unsafe {
            *self.amount.get() = amount;
        }
    }

    #[inline(always)]
    pub(crate) fn zero_gas_fee(&self) {
        unsafe {
            *self.gas_fee_amount.get() = Decimal::ZERO;
        }
    }

    #[inline(always)]
    pub(crate) fn update_status(&self, status: OrderStatus) {
        unsafe {
            *self.status.get() = status;
        }
    }

    #[inline(always)]
    pub(crate) fn is_finished(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) == OrderLifecycle::Finished.into()
    }

    #[inline(always)]
    pub(crate) fn enter_finished_from_active(&self) -> bool {
        self.lifecycle
            .compare_exchange_weak(
                OrderLifecycle::Active.into(),
                OrderLifecycle::Finished.into(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Remaining value of the order expressed in quote-currency terms
    /// (`amount * price`). Used by the admission and survival rules.
    pub fn remaining_quote(&self) -> Decimal {
        self.amount() * self.price
    }
}
