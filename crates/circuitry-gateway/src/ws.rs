//! WebSocket connection handling
//!
//! Every socket gets its own broker session. Client frames publish and
//! subscribe on that session; deliveries are pushed back as `message` events.

use crate::broker::{Broker, BrokerClient};
use crate::service::ServiceStatus;
use crate::transport::{ConnectOptions, Transport, TransportEvent};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use circuitry_core::{payload_preview, ClientFrame, EventMessage, QoS, Subscription};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared state for gateway handlers.
pub struct GatewayState {
    pub broker: Broker,
    /// Latest snapshot from the dispatch task.
    pub status: watch::Receiver<ServiceStatus>,
    pub port: u16,
    /// When the gateway started.
    pub started_at: std::time::Instant,
}

/// Handle one WebSocket client until it goes away.
///
/// A close frame ends the broker session cleanly; any other way of losing
/// the socket counts as a dropped connection.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let client_id = format!("ws-{}", Uuid::new_v4());
    let (client, mut events) = state.broker.connect(ConnectOptions::new(client_id.clone()));
    info!("Client {} connected", client_id);

    let prefix = state.status.borrow().prefix.clone();
    let info_event = EventMessage::info(env!("CARGO_PKG_VERSION"), &prefix, &client_id);
    if let Ok(json) = serde_json::to_string(&info_event) {
        let _ = ws_tx.send(WsMessage::Text(json)).await;
    }

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        for reply in handle_frame(&text, &client) {
                            if ws_tx.send(WsMessage::Text(reply)).await.is_err() {
                                return; // Client disconnected
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(_))) => {
                        if let Ok(json) = serde_json::to_string(&EventMessage::pong()) {
                            let _ = ws_tx.send(WsMessage::Text(json)).await;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Client {} disconnected", client_id);
                        client.disconnect();
                        return;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", client_id, e);
                        return;
                    }
                    None => return, // Stream ended
                    _ => {} // Binary, Pong
                }
            }

            event = events.recv() => {
                match event {
                    Some(TransportEvent::Message { topic, payload }) => {
                        let event_msg = EventMessage::message(&topic, &payload);
                        if let Ok(json) = serde_json::to_string(&event_msg) {
                            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                                return; // Client disconnected
                            }
                        }
                    }
                    Some(TransportEvent::Connected { .. }) => {}
                    Some(TransportEvent::Disconnected { reason }) => {
                        if let Ok(json) = serde_json::to_string(&EventMessage::error(&reason)) {
                            let _ = ws_tx.send(WsMessage::Text(json)).await;
                        }
                        return;
                    }
                    None => return,
                }
            }
        }
    }
}

/// Apply one client frame to the session. Returns JSON replies to send back.
fn handle_frame(text: &str, client: &BrokerClient) -> Vec<String> {
    let reply = match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Publish {
            topic,
            payload,
            retain,
        }) => {
            debug!("{} publish {} ({} bytes)", client.client_id(), topic, payload.len());
            client
                .publish(&topic, Bytes::from(payload), retain)
                .err()
                .map(EventMessage::error)
        }
        Ok(ClientFrame::Subscribe { filters, qos }) => {
            let subs: Vec<Subscription> = filters
                .iter()
                .map(|f| Subscription {
                    filter: f.clone(),
                    qos,
                })
                .collect();
            match client.subscribe(&subs) {
                Ok(()) => Some(EventMessage::new(
                    "subscribed",
                    serde_json::json!({ "filters": filters, "qos": QoS::granted(qos) }),
                )),
                Err(e) => Some(EventMessage::error(e)),
            }
        }
        Ok(ClientFrame::Unsubscribe { filters }) => {
            client.unsubscribe(&filters);
            None
        }
        Ok(ClientFrame::Ping) => Some(EventMessage::pong()),
        Err(e) => {
            warn!("Unparseable frame: {}", payload_preview(text.as_bytes()));
            Some(EventMessage::error(format!("invalid frame: {}", e)))
        }
    };

    reply
        .and_then(|evt| serde_json::to_string(&evt).ok())
        .into_iter()
        .collect()
}
