//! `ChannelHub`: multiplexes per-channel subscribers, initializes market
//! channels from a fetched snapshot plus a live `OrderbookReplica`, and
//! fans activity messages out as client-facing push frames (§4.6).
//!
//! Every channel is driven by its own single-consumer task (`run_market_channel`
//! / `run_bare_channel`) so that subscribe/unsubscribe/inbound-message
//! handling for one channel is always applied in arrival order, with no
//! cross-subscriber races, while different channels run fully concurrently
//! — the snapshot HTTP fetch for a brand new market channel only blocks
//! that channel's own creation.

use crate::config::ChannelHubConfig;
use crate::replica::OrderbookReplica;
use crate::wire::{ChannelMessage, ChannelPayload, ServerPush, SnapshotV2, snapshot_cache_key};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tracing::warn;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("snapshot unavailable for market {0}")]
    SnapshotUnavailable(String),
    #[error("channel {0} is closed")]
    ChannelClosed(String),
    #[error("send to subscriber {0} failed")]
    SubscriberSendFailure(String),
}

/// A market's point-in-time snapshot source, abstracted so the hub stays
/// testable without a live HTTP endpoint. `HttpSnapshotSource` is the real
/// implementation used in production, backed by `reqwest`.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, market_id: &str) -> Result<SnapshotV2, HubError>;
}

pub struct HttpSnapshotSource {
    client: reqwest::Client,
    config: ChannelHubConfig,
}

impl HttpSnapshotSource {
    pub fn new(config: ChannelHubConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.snapshot_fetch_timeout)
                .build()
                .expect("reqwest client with a fixed timeout never fails to build"),
            config,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, market_id: &str) -> Result<SnapshotV2, HubError> {
        let key = snapshot_cache_key(market_id);
        let url = format!("{}/snapshot/{key}", self.config.snapshot_base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| HubError::SnapshotUnavailable(market_id.to_string()))?;
        response
            .json::<SnapshotV2>()
            .await
            .map_err(|_| HubError::SnapshotUnavailable(market_id.to_string()))
    }
}

/// One connected client: a generated id and the sender half used to push
/// frames to it. Frames are opaque JSON values so that non-market channels
/// (e.g. `TraderAddress#…`) can relay payloads the hub never typechecks,
/// per §4.7.
#[derive(Clone)]
pub struct ClientHandle {
    pub id: String,
    sender: mpsc::UnboundedSender<serde_json::Value>,
}

impl ClientHandle {
    pub fn new(id: String, sender: mpsc::UnboundedSender<serde_json::Value>) -> Self {
        Self { id, sender }
    }

    fn send_push(&self, push: &ServerPush) -> Result<(), HubError> {
        let value = serde_json::to_value(push).map_err(|_| HubError::SubscriberSendFailure(self.id.clone()))?;
        self.send_raw(value)
    }

    fn send_raw(&self, value: serde_json::Value) -> Result<(), HubError> {
        self.sender
            .send(value)
            .map_err(|_| HubError::SubscriberSendFailure(self.id.clone()))
    }
}

enum ChannelCommand {
    Subscribe(ClientHandle, oneshot::Sender<()>),
    Unsubscribe(String),
    Inbound(ChannelMessage),
}

fn market_id_from_channel(channel_id: &str) -> Option<&str> {
    channel_id.strip_prefix("Market#")
}

/// Owns every live channel's command queue, creating one on first
/// subscribe/publish per the per-prefix dispatch described in §4.7.
pub struct ChannelHub {
    snapshot_source: Arc<dyn SnapshotSource>,
    channels: DashMap<String, Arc<OnceCell<mpsc::UnboundedSender<ChannelCommand>>>>,
}

impl ChannelHub {
    pub fn new(snapshot_source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            snapshot_source,
            channels: DashMap::new(),
        }
    }

    async fn channel_sender(&self, channel_id: &str) -> Result<mpsc::UnboundedSender<ChannelCommand>, HubError> {
        let cell = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let sender = cell
            .get_or_try_init(|| async {
                let (tx, rx) = mpsc::unbounded_channel();
                if let Some(market_id) = market_id_from_channel(channel_id) {
                    let snapshot = self.snapshot_source.fetch(market_id).await?;
                    let replica = OrderbookReplica::from_snapshot(market_id.to_string(), snapshot);
                    tokio::spawn(run_market_channel(channel_id.to_string(), replica, rx));
                } else {
                    tokio::spawn(run_bare_channel(rx));
                }
                Ok::<_, HubError>(tx)
            })
            .await?;
        Ok(sender.clone())
    }

    /// Subscribes `client` to `channel_id`, creating the channel (and, for
    /// a `Market#…` channel, fetching its initial snapshot) if this is the
    /// first subscriber. Fails with `SnapshotUnavailable` if that fetch
    /// fails or times out; the channel is then not created.
    pub async fn subscribe(&self, channel_id: &str, client: ClientHandle) -> Result<(), HubError> {
        let sender = self.channel_sender(channel_id).await?;
        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(ChannelCommand::Subscribe(client, ack_tx))
            .map_err(|_| HubError::ChannelClosed(channel_id.to_string()))?;
        ack_rx.await.map_err(|_| HubError::ChannelClosed(channel_id.to_string()))
    }

    pub async fn unsubscribe(&self, channel_id: &str, client_id: &str) -> Result<(), HubError> {
        let Some(cell) = self.channels.get(channel_id) else {
            return Ok(());
        };
        let Some(sender) = cell.get() else { return Ok(()) };
        sender
            .send(ChannelCommand::Unsubscribe(client_id.to_string()))
            .map_err(|_| HubError::ChannelClosed(channel_id.to_string()))
    }

    /// Feeds one message from the websocket message queue into its
    /// channel. A message for a channel with no subscribers yet (and hence
    /// no running actor) is simply dropped: late subscribers get a fresh
    /// snapshot, not a backlog.
    pub fn publish(&self, message: ChannelMessage) {
        let Some(cell) = self.channels.get(&message.channel_id) else {
            return;
        };
        let Some(sender) = cell.get() else { return };
        let _ = sender.send(ChannelCommand::Inbound(message));
    }
}

/// Pops the websocket message queue and republishes each record to the
/// hub, closing the loop described in §2's data flow between the engine's
/// activity sink and the client-facing channels. Exits once the queue is
/// cancelled.
pub async fn run_feed(queue: Arc<dyn crate::queue::EventQueue>, hub: Arc<ChannelHub>) {
    loop {
        match queue.pop().await {
            Some(bytes) => match serde_json::from_slice::<ChannelMessage>(&bytes) {
                Ok(message) => hub.publish(message),
                Err(err) => warn!(error = %err, "dropping malformed channel message"),
            },
            None => break,
        }
    }
}

fn broadcast(subscribers: &mut HashMap<String, ClientHandle>, push: &ServerPush) {
    subscribers.retain(|id, client| match client.send_push(push) {
        Ok(()) => true,
        Err(_) => {
            warn!(client_id = %id, "subscriber send failed, dropping from channel");
            false
        }
    });
}

async fn run_market_channel(
    channel_id: String,
    mut replica: OrderbookReplica,
    mut rx: mpsc::UnboundedReceiver<ChannelCommand>,
) {
    let mut subscribers: HashMap<String, ClientHandle> = HashMap::new();
    while let Some(command) = rx.recv().await {
        match command {
            ChannelCommand::Subscribe(client, ack) => {
                let snapshot = replica.projection();
                let push = ServerPush::Level2OrderbookSnapshot {
                    market_id: replica.market_id().to_string(),
                    bids: snapshot.bids,
                    asks: snapshot.asks,
                };
                if client.send_push(&push).is_ok() {
                    subscribers.insert(client.id.clone(), client);
                }
                let _ = ack.send(());
            }
            ChannelCommand::Unsubscribe(client_id) => {
                subscribers.remove(&client_id);
            }
            ChannelCommand::Inbound(message) => match message.payload {
                ChannelPayload::NewMarketTrade { trade } => {
                    broadcast(&mut subscribers, &ServerPush::NewMarketTrade { trade });
                }
                ChannelPayload::Level2Update {
                    sequence,
                    side,
                    price,
                    amount,
                } => match replica.apply_update(sequence, side, price, amount) {
                    Ok(()) => {
                        let new_total = replica.level_amount(side, price).unwrap_or(Decimal::ZERO);
                        broadcast(
                            &mut subscribers,
                            &ServerPush::Level2OrderbookUpdate {
                                market_id: replica.market_id().to_string(),
                                side,
                                price,
                                amount: new_total,
                            },
                        );
                    }
                    Err(err) => {
                        warn!(%channel_id, error = %err, "replica desync, channel needs reinitializing from a fresh snapshot");
                    }
                },
                ChannelPayload::OrderChange { .. } => {
                    // Order-change frames ride the Market# channel's wire
                    // format but are not part of the Level-2 replica path.
                }
            },
        }
    }
}

async fn run_bare_channel(mut rx: mpsc::UnboundedReceiver<ChannelCommand>) {
    let mut subscribers: HashMap<String, ClientHandle> = HashMap::new();
    while let Some(command) = rx.recv().await {
        match command {
            ChannelCommand::Subscribe(client, ack) => {
                subscribers.insert(client.id.clone(), client);
                let _ = ack.send(());
            }
            ChannelCommand::Unsubscribe(client_id) => {
                subscribers.remove(&client_id);
            }
            ChannelCommand::Inbound(message) => {
                let value = serde_json::to_value(&message.payload).unwrap_or(serde_json::Value::Null);
                subscribers.retain(|id, client| match client.send_raw(value.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        warn!(client_id = %id, "subscriber send failed, dropping from channel");
                        false
                    }
                });
            }
        }
    }
}
