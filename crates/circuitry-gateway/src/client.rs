//! WebSocket client for a running gateway
//!
//! Used by the `publish` and `subscribe` subcommands and by tests.

use anyhow::{anyhow, Context};
use circuitry_core::{ClientFrame, EventMessage, QoS};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

pub struct GatewayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    client_id: Option<String>,
}

impl GatewayClient {
    /// Connect and wait for the gateway's `info` event.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {}", url))?;
        let mut client = Self {
            ws,
            client_id: None,
        };

        match client.next_event().await? {
            Some(evt) if evt.event == "info" => {
                client.client_id = evt.data["client_id"].as_str().map(String::from);
                debug!("Connected as {:?}", client.client_id);
                Ok(client)
            }
            Some(evt) => Err(anyhow!("expected info event, got {}", evt.event)),
            None => Err(anyhow!("gateway closed the connection")),
        }
    }

    /// Broker session id assigned by the gateway.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub async fn send(&mut self, frame: &ClientFrame) -> anyhow::Result<()> {
        let text = serde_json::to_string(frame)?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> anyhow::Result<()> {
        self.send(&ClientFrame::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        })
        .await
    }

    /// Subscribe and wait for the acknowledgement. Deliveries that arrive
    /// first (retained messages) are returned rather than dropped.
    pub async fn subscribe(&mut self, filters: &[String]) -> anyhow::Result<Vec<(String, String)>> {
        self.send(&ClientFrame::Subscribe {
            filters: filters.to_vec(),
            qos: QoS::AtMostOnce,
        })
        .await?;

        let mut early = Vec::new();
        loop {
            match self.next_event().await? {
                Some(evt) if evt.event == "subscribed" => return Ok(early),
                Some(evt) if evt.event == "error" => {
                    return Err(anyhow!("subscribe rejected: {}", evt.data["message"]))
                }
                Some(evt) => {
                    if let Some((topic, payload)) = evt.as_delivery() {
                        early.push((topic.to_string(), payload.to_string()));
                    }
                }
                None => return Err(anyhow!("gateway closed the connection")),
            }
        }
    }

    /// Next event from the gateway, or `None` once the socket is closed.
    pub async fn next_event(&mut self) -> anyhow::Result<Option<EventMessage>> {
        while let Some(msg) = self.ws.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str::<EventMessage>(&text) {
                    Ok(evt) => return Ok(Some(evt)),
                    Err(e) => warn!("Unparseable event ({}): {}", e, text),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Next `(topic, payload)` delivery, skipping other events.
    pub async fn next_delivery(&mut self) -> anyhow::Result<Option<(String, String)>> {
        while let Some(evt) = self.next_event().await? {
            if let Some((topic, payload)) = evt.as_delivery() {
                return Ok(Some((topic.to_string(), payload.to_string())));
            }
            if evt.event == "error" {
                warn!("Gateway error: {}", evt.data);
            }
        }
        Ok(None)
    }

    /// Close cleanly; the broker discards this session's will.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

/// One-shot publish.
pub async fn publish(url: &str, topic: &str, payload: &str, retain: bool) -> anyhow::Result<()> {
    let mut client = GatewayClient::connect(url).await?;
    client.publish(topic, payload, retain).await?;
    client.close().await
}

/// Subscribe and hand every delivery to `on_message` until the gateway goes away.
pub async fn subscribe<F>(url: &str, filters: &[String], mut on_message: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &str),
{
    let mut client = GatewayClient::connect(url).await?;
    for (topic, payload) in client.subscribe(filters).await? {
        on_message(&topic, &payload);
    }
    while let Some((topic, payload)) = client.next_delivery().await? {
        on_message(&topic, &payload);
    }
    Ok(())
}
