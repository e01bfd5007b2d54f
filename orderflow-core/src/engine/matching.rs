use super::book::DefaultOrderBook;
use super::error::EngineError;
use super::types::{Order, OrderId, OrderKind, Price, Quantity, Side};
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// One resting order's contribution to a match.
#[derive(Debug, Clone)]
pub struct MatchItem {
    pub maker_id: OrderId,
    /// The price this fill executed at — the maker's resting price, per
    /// price-time priority (the taker's own price, if any, only bounds
    /// which makers it may cross, not the execution price).
    pub price: Price,
    pub maker_order_is_done: bool,
    pub matched_amount: Quantity,
    /// The match failed the economic-viability check (§ dust cancellation)
    /// and must be excluded from book mutation and from totals.
    pub match_should_be_canceled: bool,
}

/// The outcome of matching one taker order against resting liquidity.
/// Produced by `match_order` without mutating the book; consumed by
/// `execute_match`, which applies it.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub taker_order_is_done: bool,
    pub match_items: Vec<MatchItem>,
    pub taker_order_left_amount: Quantity,
}

impl MatchResult {
    pub fn base_token_total_matched_amount_without_canceled(&self) -> Decimal {
        self.match_items
            .iter()
            .filter(|item| !item.match_should_be_canceled)
            .map(|item| item.matched_amount)
            .sum()
    }

    pub fn has_match(&self) -> bool {
        !self.match_items.is_empty()
    }
}

/// Pure read: walks the opposing side of `book`, best price first and FIFO
/// within a level, and tells the caller how `taker` would fill without
/// mutating anything. `market_amount_decimals` bounds the precision of the
/// quote-to-base conversion used for a partial market-buy fill.
pub fn match_order(book: &DefaultOrderBook, taker: &Order, market_amount_decimals: u32) -> MatchResult {
    let opposite = taker.side.opposite();
    // A market order carries a bound only when its price was set (> 0); a
    // limit order's price always bounds it. Mirrors the Go original's
    // `takerOrder.Price.GreaterThan(decimal.Zero)` check for market orders.
    let bound = if taker.price.is_zero() { None } else { Some(taker.price) };

    let levels = book.levels_read(opposite);
    let mut remaining = taker.amount();
    let mut items = Vec::new();

    let prices: Vec<_> = match opposite {
        Side::Sell => levels.keys().copied().collect(),
        Side::Buy => levels.keys().rev().copied().collect(),
    };

    'levels: for price in prices {
        if let Some(bound) = bound {
            let crosses = match taker.side {
                Side::Buy => bound >= price,
                Side::Sell => bound <= price,
            };
            if !crosses {
                break;
            }
        }
        let level = levels.get(&price).expect("price came from this level map");
        for maker in level.iter() {
            if remaining.is_zero() {
                break 'levels;
            }
            let matched = if taker.side == Side::Buy && taker.kind == OrderKind::Market {
                // `remaining` is a quote-currency budget for a market buy.
                let maker_quote = maker.amount() * maker.price;
                if remaining >= maker_quote {
                    maker.amount()
                } else {
                    (remaining / maker.price)
                        .round_dp_with_strategy(market_amount_decimals + 1, RoundingStrategy::ToZero)
                        .round_dp_with_strategy(market_amount_decimals, RoundingStrategy::ToZero)
                }
            } else {
                remaining.min(maker.amount())
            };
            if matched.is_zero() {
                break 'levels;
            }
            let maker_done = matched >= maker.amount();
            items.push(MatchItem {
                maker_id: maker.id.clone(),
                price: maker.price,
                maker_order_is_done: maker_done,
                matched_amount: matched,
                match_should_be_canceled: false,
            });
            remaining -= if taker.side == Side::Buy && taker.kind == OrderKind::Market {
                matched * maker.price
            } else {
                matched
            };
        }
    }

    MatchResult {
        taker_order_is_done: false,
        match_items: items,
        taker_order_left_amount: remaining,
    }
}

/// Applies the dust-cancellation rule in place on `result`. See the
/// economic-viability rule: a match whose value cannot cover its own gas and
/// fee cost is not worth settling and is marked canceled rather than
/// mutating the book.
fn cancel_small_matches_if_exist(book: &DefaultOrderBook, taker: &Order, result: &mut MatchResult) {
    let levels = book.levels_read(taker.side.opposite());
    match taker.side {
        Side::Buy => {
            for item in &mut result.match_items {
                let Some((_, price)) = book.order_index().get(&item.maker_id).map(|e| *e) else {
                    continue;
                };
                let Some(level) = levels.get(&price) else { continue };
                let Some(maker) = level.get(&item.maker_id) else { continue };
                let quote = item.matched_amount * maker.price;
                if quote < maker.gas_fee_amount() + maker.maker_fee_rate * quote {
                    item.match_should_be_canceled = true;
                }
            }
        }
        Side::Sell => {
            let quote_total: Decimal = result
                .match_items
                .iter()
                .filter_map(|item| {
                    let (_, price) = *book.order_index().get(&item.maker_id)?;
                    Some(item.matched_amount * price)
                })
                .sum();
            if quote_total < taker.gas_fee_amount() + taker.taker_fee_rate * quote_total {
                for item in &mut result.match_items {
                    item.match_should_be_canceled = true;
                }
            }
        }
    }
}

/// Whether a post-fill maker (or taker, applying the same formula with the
/// taker's own costs) remains economically worth keeping on the book.
fn remaining_clears_costs(side: Side, remaining_quote: Decimal, gas: Decimal, fee_rate: Decimal) -> bool {
    match side {
        Side::Sell => remaining_quote > Decimal::ZERO,
        Side::Buy => remaining_quote > Decimal::ZERO && remaining_quote - (gas + remaining_quote * fee_rate) > Decimal::ZERO,
    }
}

/// Runs the full create-order path for `taker`: pure match, dust
/// cancellation, then commits the surviving items against the book. Returns
/// the (possibly dust-adjusted) result; the caller (`MarketHandler`) is
/// responsible for admission of any taker remainder.
pub fn execute_match(
    book: &DefaultOrderBook,
    taker: &Order,
    market_amount_decimals: u32,
) -> Result<MatchResult, EngineError> {
    let mut result = match_order(book, taker, market_amount_decimals);
    if result.match_items.is_empty() {
        return Ok(result);
    }
    cancel_small_matches_if_exist(book, taker, &mut result);

    let opposite = taker.side.opposite();
    for item in &mut result.match_items {
        if item.match_should_be_canceled {
            // Untouched: the maker keeps whatever resting amount it had.
            item.maker_order_is_done = false;
            continue;
        }
        let Some((_, price)) = book.order_index().get(&item.maker_id).map(|e| *e) else {
            continue;
        };
        let mut levels = book.levels_write(opposite);
        let Some(level) = levels.get_mut(&price) else { continue };
        let Some(maker) = level.get(&item.maker_id) else { continue };

        let post_fill_quote = (maker.amount() - item.matched_amount) * maker.price;
        let maker_survives = !item.maker_order_is_done
            && remaining_clears_costs(opposite, post_fill_quote, taker.gas_fee_amount(), taker.taker_fee_rate);

        if maker_survives {
            maker.reduce_amount(item.matched_amount);
            maker.zero_gas_fee();
            level.change_total(-item.matched_amount);
            let sequence = book.bump_sequence_pub();
            book.notify_change(sequence, maker, -item.matched_amount);
        } else {
            // Remove before adjusting the maker's own amount field: the
            // level's running total is decremented by whatever `amount()`
            // reads at removal time, so it must still reflect the resting
            // amount as it stood before this match.
            drop(levels);
            book.remove(&item.maker_id)?;
            // Dust-removed as well as fully-filled counts as "done" (§3).
            item.maker_order_is_done = true;
        }
    }

    Ok(result)
}
