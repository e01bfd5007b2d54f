//! The thin integration point between a live WebSocket connection and the
//! `ChannelHub`: an axum upgrade handler plus the per-connection dispatch
//! loop that turns `{Type, Channels}` client frames into hub subscribe and
//! unsubscribe calls (§4.7). The socket accept loop itself (binding a
//! port) is left to the embedding binary; this module only wires one
//! already-upgraded connection to the hub.

use crate::hub::{ChannelHub, ClientHandle};
use crate::wire::{ClientRequest, ClientRequestType};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// An axum router exposing a single `GET /ws` upgrade endpoint wired to
/// `serve_websocket`. Embedding binaries may merge this into a larger
/// router or ignore it and call `serve_websocket` from their own handler.
pub fn router(hub: Arc<ChannelHub>) -> Router {
    Router::new().route("/ws", get(websocket_handler)).with_state(hub)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(hub): State<Arc<ChannelHub>>) -> Response {
    ws.on_upgrade(move |socket| serve_websocket(socket, hub))
}

/// Drives one client connection until it disconnects: parses inbound
/// `{Type, Channels}` frames, forwards them to the hub, and relays
/// whatever the hub pushes back. Unsubscribes every channel the client was
/// on when the connection ends.
pub async fn serve_websocket(mut socket: WebSocket, hub: Arc<ChannelHub>) {
    let client_id = Uuid::new_v4().to_string();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<serde_json::Value>();
    let client = ClientHandle::new(client_id.clone(), out_tx);
    let mut subscribed: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            frame = socket.recv() => {
                let Some(Ok(message)) = frame else { break };
                let Message::Text(text) = message else { continue };
                let request: ClientRequest = match serde_json::from_str(&text) {
                    Ok(request) => request,
                    Err(err) => {
                        warn!(%client_id, error = %err, "dropping malformed client frame");
                        continue;
                    }
                };
                match request.request_type {
                    ClientRequestType::Subscribe => {
                        for channel_id in request.channels {
                            match hub.subscribe(&channel_id, client.clone()).await {
                                Ok(()) => subscribed.push(channel_id),
                                Err(err) => warn!(%client_id, %channel_id, error = %err, "subscribe failed"),
                            }
                        }
                    }
                    ClientRequestType::Unsubscribe => {
                        for channel_id in request.channels {
                            let _ = hub.unsubscribe(&channel_id, &client_id).await;
                            subscribed.retain(|c| c != &channel_id);
                        }
                    }
                }
            }
            Some(value) = out_rx.recv() => {
                let text = value.to_string();
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            else => break,
        }
    }

    for channel_id in subscribed {
        let _ = hub.unsubscribe(&channel_id, &client_id).await;
    }
}
