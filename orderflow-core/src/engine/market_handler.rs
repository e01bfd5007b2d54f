use super::book::DefaultOrderBook;
use super::error::EngineError;
use super::matching::{self, MatchResult};
use super::observer::BookObserver;
use super::types::{MarketId, Order, Side};
use crate::activity::ActivityCollector;
use crate::wire::ChannelMessage;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns one market's book and implements the create/cancel entry points a
/// dispatcher routes events to.
///
/// `market_amount_decimals` bounds the precision used when converting a
/// market-buy's quote budget into a partial base-currency fill; it is a
/// per-market constant (set from the market's base-token decimals), not a
/// global default.
///
/// `lock` serializes the two entry points: the dispatcher may route events
/// for different markets to different tasks concurrently (see
/// `EngineDispatcher::run`), but within one market's handler every event is
/// applied strictly in arrival order, per §5's "one market matches strictly
/// serially" rule.
pub struct MarketHandler {
    market_id: MarketId,
    book: DefaultOrderBook,
    market_amount_decimals: u32,
    activity_collector: Arc<ActivityCollector>,
    lock: Mutex<()>,
}

impl MarketHandler {
    pub fn new(market_id: MarketId, market_amount_decimals: u32, observers: Vec<Arc<dyn BookObserver>>) -> Self {
        let activity_collector = Arc::new(ActivityCollector::new());
        let mut all_observers = observers;
        all_observers.push(activity_collector.clone() as Arc<dyn BookObserver>);
        let book = DefaultOrderBook::new(market_id.clone(), all_observers);
        Self {
            market_id,
            book,
            market_amount_decimals,
            activity_collector,
            lock: Mutex::new(()),
        }
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn book(&self) -> &DefaultOrderBook {
        &self.book
    }

    /// Matches `order` against resting liquidity (if it crosses), decrements
    /// its working amount by the non-canceled matched total, then applies
    /// the taker admission rule to decide whether the remainder rests on
    /// the book. Returns the match result, whether the taker ended up
    /// admitted as a new resting order, and the level-2 update activities
    /// produced by every book mutation this call committed.
    pub fn handle_new_order(&self, order: &mut Order) -> Result<(MatchResult, bool, Vec<ChannelMessage>), EngineError> {
        let _guard = self.lock.lock();

        // A market order carries a bound only when its price was set (> 0);
        // a limit order's price always bounds it.
        let bound = if order.price.is_zero() { None } else { Some(order.price) };

        let result = if self.book.can_match(order.side, bound) {
            matching::execute_match(&self.book, order, self.market_amount_decimals)?
        } else {
            MatchResult::default()
        };

        let matched_non_canceled = result.base_token_total_matched_amount_without_canceled();
        if !matched_non_canceled.is_zero() {
            order.reduce_amount(matched_non_canceled);
        }

        let admitted = self.admit_taker(order);
        Ok((result, admitted, self.activity_collector.drain()))
    }

    /// Applies the taker admission rule: a leftover order only rests if its
    /// remaining quote value is positive (sell) or positive after its own
    /// gas and fee cost (buy). An unbounded market order's price is zero, so
    /// its remaining quote is always zero and it never clears this rule —
    /// no separate "market orders never rest" branch is needed.
    fn admit_taker(&self, order: &mut Order) -> bool {
        if order.amount().is_zero() {
            return false;
        }
        let remaining_quote = order.remaining_quote();
        let admit = match order.side {
            Side::Sell => remaining_quote > rust_decimal::Decimal::ZERO,
            Side::Buy => {
                remaining_quote > rust_decimal::Decimal::ZERO
                    && remaining_quote - (order.gas_fee_amount() + remaining_quote * order.taker_fee_rate)
                        > rust_decimal::Decimal::ZERO
            }
        };
        if !admit {
            return false;
        }
        order.zero_gas_fee();
        self.book
            .insert(order.clone())
            .expect("freshly validated taker id is not already in the book");
        true
    }

    /// Removes a resting order. `None` if it was not present — a cancel
    /// racing a full fill is not an error. Returns the level-2 update
    /// activity the removal produced, if any.
    pub fn handle_cancel_order(&self, order_id: &str) -> (Option<Order>, Vec<ChannelMessage>) {
        let _guard = self.lock.lock();
        let removed = self.book.remove(order_id).ok();
        (removed, self.activity_collector.drain())
    }
}
