//! Transport adapter seam
//!
//! The router only needs to publish and subscribe; connection handling,
//! sessions and delivery belong to the adapter. Inbound traffic reaches the
//! router as `TransportEvent`s, one at a time.

use bytes::Bytes;
use circuitry_core::{Result, Subscription};

/// Outbound half of a pub/sub connection.
pub trait Transport {
    /// Fire-and-forget publish.
    fn publish(&self, topic: &str, payload: Bytes, retain: bool) -> Result<()>;

    /// Subscribe to topic filters. Subscribing twice to the same filter is a no-op.
    fn subscribe(&self, subscriptions: &[Subscription]) -> Result<()>;
}

/// Inbound half of a pub/sub connection.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The session is up. `code` 0 means accepted.
    Connected { code: u8 },
    Message { topic: String, payload: Bytes },
    /// The session ended; the adapter may reconnect.
    Disconnected { reason: String },
}

/// Published by the broker when a session ends without a clean disconnect.
#[derive(Clone, Debug, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub payload: Bytes,
    pub retain: bool,
}

impl LastWill {
    /// Retained will with an empty payload: clears whatever is retained on `topic`.
    pub fn clear_retained(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: Bytes::new(),
            retain: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectOptions {
    pub client_id: String,
    pub last_will: Option<LastWill>,
}

impl ConnectOptions {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            last_will: None,
        }
    }

    pub fn with_last_will(mut self, will: LastWill) -> Self {
        self.last_will = Some(will);
        self
    }
}
