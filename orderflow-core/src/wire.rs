//! JSON wire types: the engine's event-queue input, and the activity
//! messages it emits toward the websocket message queue and the
//! client-facing channel protocol.

use crate::engine::types::{MarketId, OrderId, Price, Quantity, Side};
use serde::{Deserialize, Serialize};

/// One record popped off the inbound event queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "eventType")]
pub enum InboundEvent {
    #[serde(rename = "EVENT/NEW_ORDER")]
    NewOrder {
        #[serde(rename = "marketID")]
        market_id: MarketId,
        order: NewOrderPayload,
    },
    #[serde(rename = "EVENT/EVENT_CANCEL_ORDER")]
    CancelOrder {
        #[serde(rename = "marketID")]
        market_id: MarketId,
        id: OrderId,
        price: Price,
        side: Side,
    },
    #[serde(rename = "EVENT/EVENT_CONFIRM_TRANSACTION")]
    ConfirmTransaction {
        hash: String,
        status: TransactionStatus,
        timestamp: u64,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Successful,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderPayload {
    pub id: OrderId,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: crate::engine::types::OrderKind,
    pub trader: String,
    pub price: Price,
    pub amount: Quantity,
    #[serde(rename = "gasFeeAmount", default)]
    pub gas_fee_amount: Quantity,
    #[serde(rename = "makerFeeRate", default)]
    pub maker_fee_rate: rust_decimal::Decimal,
    #[serde(rename = "takerFeeRate", default)]
    pub taker_fee_rate: rust_decimal::Decimal,
}

/// One record pushed onto the websocket message queue, destined for a
/// `ChannelHub` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel_id: String,
    pub payload: ChannelPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelPayload {
    #[serde(rename = "orderChange")]
    OrderChange { order_id: OrderId, status: String },
    #[serde(rename = "newMarketTrade")]
    NewMarketTrade { trade: TradePayload },
    #[serde(rename = "level2Update")]
    Level2Update {
        sequence: u64,
        side: Side,
        price: Price,
        /// Signed delta in resting amount at this level.
        amount: Quantity,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePayload {
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub price: Price,
    pub amount: Quantity,
}

/// Channel id helpers; the hub dispatches channel creation by prefix.
pub fn market_channel_id(market_id: &str) -> String {
    format!("Market#{market_id}")
}

pub fn trader_channel_id(address: &str) -> String {
    format!("TraderAddress#{address}")
}

/// Snapshot cache key for a market's V2 order book snapshot.
pub fn snapshot_cache_key(market_id: &str) -> String {
    format!("HYDRO_MARKET_ORDERBOOK_SNAPSHOT_V2:{market_id}")
}

/// Wire form of a book snapshot (`§6`): dense `[price, amount]` string pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotV2 {
    pub sequence: u64,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

impl From<crate::engine::book::BookSnapshot> for SnapshotV2 {
    fn from(snap: crate::engine::book::BookSnapshot) -> Self {
        Self {
            sequence: snap.sequence,
            bids: snap.bids,
            asks: snap.asks,
        }
    }
}

/// Client request frame: subscribe/unsubscribe to one or more channels.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    #[serde(rename = "Type")]
    pub request_type: ClientRequestType,
    #[serde(rename = "Channels")]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientRequestType {
    Subscribe,
    Unsubscribe,
}

/// Server push frame delivered to a subscribed client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerPush {
    #[serde(rename = "level2OrderbookSnapshot")]
    Level2OrderbookSnapshot {
        #[serde(rename = "marketID")]
        market_id: MarketId,
        bids: Vec<(Price, Quantity)>,
        asks: Vec<(Price, Quantity)>,
    },
    #[serde(rename = "level2OrderbookUpdate")]
    Level2OrderbookUpdate {
        #[serde(rename = "marketID")]
        market_id: MarketId,
        side: Side,
        price: Price,
        /// The level's NEW total amount, not a delta.
        amount: Quantity,
    },
    #[serde(rename = "newMarketTrade")]
    NewMarketTrade { trade: TradePayload },
}
