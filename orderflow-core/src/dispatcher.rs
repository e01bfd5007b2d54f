//! Routes inbound events to the correct `MarketHandler`, creating one on
//! first use, and fans a successful new-order handling out to whichever
//! sinks are registered.

use crate::config::EngineConfig;
use crate::engine::market_handler::MarketHandler;
use crate::engine::matching::MatchResult;
use crate::engine::observer::BookObserver;
use crate::engine::types::{MarketId, Order};
use crate::wire::{ChannelMessage, InboundEvent, NewOrderPayload};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Invoked with the match result of a successfully handled new order, for
/// persistence of trades.
pub trait MatchResultSink: Send + Sync {
    fn on_match_result(&self, market_id: &str, result: &MatchResult);
}

/// Invoked with a market's current snapshot after every handled event,
/// keyed the same way the websocket-facing snapshot cache is keyed.
pub trait SnapshotSink: Send + Sync {
    fn on_snapshot(&self, key: &str, snapshot: &crate::wire::SnapshotV2);
}

/// Invoked with the activity messages produced by handling one event.
pub trait ActivitySink: Send + Sync {
    fn on_activities(&self, messages: &[crate::wire::ChannelMessage]);
}

/// Owns every open market's handler and the (optional) downstream sinks.
///
/// Per-event routing serializes access to one market: two events for the
/// same market never run concurrently, because `markets` hands back a
/// reference behind `DashMap`'s per-shard lock and each `MarketHandler`'s
/// book itself only allows one exclusive mutator at a time by construction
/// (see `engine::book`). Two different markets may be handled concurrently.
pub struct EngineDispatcher {
    markets: DashMap<MarketId, Arc<MarketHandler>>,
    config: EngineConfig,
    observers: Vec<Arc<dyn BookObserver>>,
    match_result_sink: Option<Arc<dyn MatchResultSink>>,
    snapshot_sink: Option<Arc<dyn SnapshotSink>>,
    activity_sink: Option<Arc<dyn ActivitySink>>,
}

impl EngineDispatcher {
    pub fn new(config: EngineConfig, observers: Vec<Arc<dyn BookObserver>>) -> Self {
        Self {
            markets: DashMap::new(),
            config,
            observers,
            match_result_sink: None,
            snapshot_sink: None,
            activity_sink: None,
        }
    }

    pub fn register_match_result_sink(&mut self, sink: Arc<dyn MatchResultSink>) {
        self.match_result_sink = Some(sink);
    }

    pub fn register_snapshot_sink(&mut self, sink: Arc<dyn SnapshotSink>) {
        self.snapshot_sink = Some(sink);
    }

    pub fn register_activity_sink(&mut self, sink: Arc<dyn ActivitySink>) {
        self.activity_sink = Some(sink);
    }

    fn market_handler(&self, market_id: &str) -> Arc<MarketHandler> {
        if let Some(handler) = self.markets.get(market_id) {
            return handler.clone();
        }
        let handler = Arc::new(MarketHandler::new(
            market_id.to_string(),
            self.config.default_market_amount_decimals,
            self.observers.clone(),
        ));
        self.markets.insert(market_id.to_string(), handler.clone());
        handler
    }

    /// Parses and routes one raw event. Malformed JSON and unknown event
    /// types are logged and swallowed rather than propagated, so a single
    /// bad record never stalls the queue.
    pub fn handle_raw_event(&self, bytes: &[u8]) {
        let event: InboundEvent = match serde_json::from_slice(bytes) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "dropping malformed event");
                return;
            }
        };
        match event {
            InboundEvent::NewOrder { market_id, order } => self.handle_new_order(&market_id, order),
            InboundEvent::CancelOrder { market_id, id, .. } => self.handle_cancel_order(&market_id, &id),
            InboundEvent::ConfirmTransaction { hash, status, .. } => {
                info!(%hash, ?status, "transaction confirmation observed (settlement out of scope)");
            }
        }
    }

    fn handle_new_order(&self, market_id: &str, payload: NewOrderPayload) {
        let handler = self.market_handler(market_id);
        let mut order = Order::new(
            payload.id,
            market_id.to_string(),
            payload.side,
            payload.kind,
            payload.trader,
            payload.price,
            payload.amount,
            payload.gas_fee_amount,
            payload.maker_fee_rate,
            payload.taker_fee_rate,
            now_micros(),
        );

        let (result, _admitted, mut activities) = match handler.handle_new_order(&mut order) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%market_id, error = %err, "new order rejected by invariant check");
                return;
            }
        };

        if let Some(sink) = &self.match_result_sink {
            sink.on_match_result(market_id, &result);
        }
        if let Some(sink) = &self.snapshot_sink {
            let key = crate::wire::snapshot_cache_key(market_id);
            let snapshot = crate::wire::SnapshotV2::from(handler.book().snapshot());
            sink.on_snapshot(&key, &snapshot);
        }
        if let Some(sink) = &self.activity_sink {
            activities.extend(new_order_activities(market_id, &order, &result));
            sink.on_activities(&activities);
        }
    }

    fn handle_cancel_order(&self, market_id: &str, order_id: &str) {
        let Some(handler) = self.markets.get(market_id) else {
            warn!(%market_id, "cancel for market that was never opened");
            return;
        };
        let (removed, activities) = handler.handle_cancel_order(order_id);
        match removed {
            Some(_) => {
                if let Some(sink) = &self.snapshot_sink {
                    let key = crate::wire::snapshot_cache_key(market_id);
                    let snapshot = crate::wire::SnapshotV2::from(handler.book().snapshot());
                    sink.on_snapshot(&key, &snapshot);
                }
                if let Some(sink) = &self.activity_sink {
                    if !activities.is_empty() {
                        sink.on_activities(&activities);
                    }
                }
            }
            None => warn!(%market_id, %order_id, "cancel for order not present in the book"),
        }
    }

    /// Drives this dispatcher from an inbound event queue until the queue
    /// is cancelled (its `pop` returns `None`). Each popped event is routed
    /// on its own task so that two different markets may match
    /// concurrently; a single market's events stay ordered because
    /// `MarketHandler` serializes its own two entry points (§5).
    pub async fn run(self: Arc<Self>, queue: Arc<dyn crate::queue::EventQueue>) {
        loop {
            match queue.pop().await {
                Some(bytes) => {
                    let dispatcher = self.clone();
                    tokio::spawn(async move { dispatcher.handle_raw_event(&bytes) });
                }
                None => {
                    info!("event queue cancelled, dispatcher loop exiting");
                    break;
                }
            }
        }
    }
}

/// Pushes every activity message as a JSON record onto the websocket
/// message queue described in §6 — the hand-off point between the engine
/// and `hub::run_feed`, which pops this same queue and calls
/// `ChannelHub::publish`.
pub struct QueueActivitySink {
    queue: Arc<dyn crate::queue::EventQueue>,
}

impl QueueActivitySink {
    pub fn new(queue: Arc<dyn crate::queue::EventQueue>) -> Self {
        Self { queue }
    }
}

impl ActivitySink for QueueActivitySink {
    fn on_activities(&self, messages: &[ChannelMessage]) {
        let queue = self.queue.clone();
        let encoded: Vec<Vec<u8>> = messages
            .iter()
            .filter_map(|message| serde_json::to_vec(message).ok())
            .collect();
        tokio::spawn(async move {
            for bytes in encoded {
                queue.push(bytes).await;
            }
        });
    }
}

/// Builds the activity messages for one handled new-order event: a trade
/// notice per non-canceled match, plus an order-change for the taker
/// itself. Level-2 update activities are appended separately by the
/// caller, drained from the market handler's `ActivityCollector`.
fn new_order_activities(
    market_id: &str,
    taker: &Order,
    result: &MatchResult,
) -> Vec<crate::wire::ChannelMessage> {
    use crate::wire::{ChannelMessage, ChannelPayload, TradePayload, market_channel_id};

    let channel_id = market_channel_id(market_id);
    let mut messages: Vec<ChannelMessage> = result
        .match_items
        .iter()
        .filter(|item| !item.match_should_be_canceled)
        .map(|item| ChannelMessage {
            channel_id: channel_id.clone(),
            payload: ChannelPayload::NewMarketTrade {
                trade: TradePayload {
                    maker_order_id: item.maker_id.clone(),
                    taker_order_id: taker.id.clone(),
                    price: item.price,
                    amount: item.matched_amount,
                },
            },
        })
        .collect();

    messages.push(ChannelMessage {
        channel_id,
        payload: ChannelPayload::OrderChange {
            order_id: taker.id.clone(),
            status: format!("{:?}", taker.status()),
        },
    });
    messages
}

/// Matches the original system's microsecond order timestamps.
fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
