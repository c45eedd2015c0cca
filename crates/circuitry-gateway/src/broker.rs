//! In-process pub/sub broker
//!
//! MQTT-style topic filters (`+` for one level, `#` for the rest), retained
//! messages, and last wills published when a session ends uncleanly.
//! Delivery is at-most-once: a subscriber whose channel is gone is skipped.

use crate::transport::{ConnectOptions, LastWill, Transport, TransportEvent};
use bytes::Bytes;
use circuitry_core::{Error, QoS, Result, Subscription};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

struct Session {
    connection: Uuid,
    filters: Vec<String>,
    tx: mpsc::UnboundedSender<TransportEvent>,
    will: Option<LastWill>,
}

#[derive(Default)]
struct BrokerInner {
    sessions: DashMap<String, Session>,
    retained: DashMap<String, Bytes>,
}

/// Shared broker handle. Cheap to clone.
#[derive(Clone, Default)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session. The first event on the returned channel is `Connected`.
    ///
    /// A session already using the same client id is taken over.
    pub fn connect(
        &self,
        options: ConnectOptions,
    ) -> (BrokerClient, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Uuid::new_v4();
        let _ = tx.send(TransportEvent::Connected { code: 0 });

        let session = Session {
            connection,
            filters: Vec::new(),
            tx,
            will: options.last_will,
        };
        if let Some(old) = self.inner.sessions.insert(options.client_id.clone(), session) {
            let _ = old.tx.send(TransportEvent::Disconnected {
                reason: "session taken over".to_string(),
            });
        }
        debug!("broker: {} connected", options.client_id);

        let client = BrokerClient {
            broker: self.clone(),
            client_id: options.client_id,
            connection,
            closed: false,
        };
        (client, rx)
    }

    /// Publish to every matching subscriber. Returns the number of deliveries.
    pub fn publish(&self, topic: &str, payload: Bytes, retain: bool) -> usize {
        if retain {
            if payload.is_empty() {
                self.inner.retained.remove(topic);
            } else {
                self.inner.retained.insert(topic.to_string(), payload.clone());
            }
        }

        let mut delivered = 0;
        for session in self.inner.sessions.iter() {
            if !session.filters.iter().any(|f| topic_matches(f, topic)) {
                continue;
            }
            let event = TransportEvent::Message {
                topic: topic.to_string(),
                payload: payload.clone(),
            };
            if session.tx.send(event).is_ok() {
                delivered += 1;
            } else {
                debug!("broker: {} is gone, dropped {}", session.key(), topic);
            }
        }
        delivered
    }

    fn subscribe(&self, client_id: &str, connection: Uuid, subscriptions: &[Subscription]) -> Result<()> {
        for sub in subscriptions {
            if !is_valid_filter(&sub.filter) {
                return Err(Error::transport(format!("invalid topic filter: {}", sub.filter)));
            }
        }

        let mut session = self
            .inner
            .sessions
            .get_mut(client_id)
            .filter(|s| s.connection == connection)
            .ok_or_else(|| Error::transport(format!("{} is not connected", client_id)))?;

        for sub in subscriptions {
            if QoS::granted(sub.qos) != sub.qos {
                debug!(
                    "broker: {} asked {:?} on {}, granted at-most-once",
                    client_id, sub.qos, sub.filter
                );
            }
            if session.filters.contains(&sub.filter) {
                continue;
            }
            session.filters.push(sub.filter.clone());

            for retained in self.inner.retained.iter() {
                if topic_matches(&sub.filter, retained.key()) {
                    let _ = session.tx.send(TransportEvent::Message {
                        topic: retained.key().clone(),
                        payload: retained.value().clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn unsubscribe(&self, client_id: &str, connection: Uuid, filters: &[String]) {
        if let Some(mut session) = self.inner.sessions.get_mut(client_id) {
            if session.connection == connection {
                session.filters.retain(|f| !filters.contains(f));
            }
        }
    }

    fn end_session(&self, client_id: &str, connection: Uuid, graceful: bool) {
        let removed = self
            .inner
            .sessions
            .remove_if(client_id, |_, s| s.connection == connection);
        if let Some((_, session)) = removed {
            debug!("broker: {} disconnected (graceful: {})", client_id, graceful);
            if !graceful {
                self.publish_will(client_id, session.will);
            }
        }
    }

    /// Drop a session as if its connection failed: the client is told it was
    /// disconnected and its last will is published.
    pub fn kick(&self, client_id: &str) -> bool {
        match self.inner.sessions.remove(client_id) {
            Some((_, session)) => {
                info!("broker: kicked {}", client_id);
                let _ = session.tx.send(TransportEvent::Disconnected {
                    reason: "kicked by broker".to_string(),
                });
                self.publish_will(client_id, session.will);
                true
            }
            None => false,
        }
    }

    fn publish_will(&self, client_id: &str, will: Option<LastWill>) {
        if let Some(will) = will {
            debug!("broker: publishing last will of {} on {}", client_id, will.topic);
            self.publish(&will.topic, will.payload, will.retain);
        }
    }

    pub fn retained(&self, topic: &str) -> Option<Bytes> {
        self.inner.retained.get(topic).map(|v| v.value().clone())
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.inner.sessions.contains_key(client_id)
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

/// One session on a `Broker`.
///
/// `disconnect` ends the session cleanly; dropping the client without it
/// counts as a lost connection and fires the last will.
pub struct BrokerClient {
    broker: Broker,
    client_id: String,
    connection: Uuid,
    closed: bool,
}

impl BrokerClient {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn unsubscribe(&self, filters: &[String]) {
        self.broker.unsubscribe(&self.client_id, self.connection, filters);
    }

    pub fn disconnect(mut self) {
        self.broker.end_session(&self.client_id, self.connection, true);
        self.closed = true;
    }

    /// End the session as a lost connection.
    pub fn abort(self) {}
}

impl Drop for BrokerClient {
    fn drop(&mut self) {
        if !self.closed {
            self.broker.end_session(&self.client_id, self.connection, false);
        }
    }
}

impl Transport for BrokerClient {
    fn publish(&self, topic: &str, payload: Bytes, retain: bool) -> Result<()> {
        if topic.contains(['+', '#']) {
            return Err(Error::transport(format!("cannot publish to a filter: {}", topic)));
        }
        self.broker.publish(topic, payload, retain);
        Ok(())
    }

    fn subscribe(&self, subscriptions: &[Subscription]) -> Result<()> {
        self.broker.subscribe(&self.client_id, self.connection, subscriptions)
    }
}

/// Whether `topic` is matched by `filter`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// `+` and `#` must fill a whole level, and `#` must be the last one.
pub fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    levels.iter().enumerate().all(|(i, level)| match *level {
        "#" => i == last,
        "+" => true,
        other => !other.contains(['+', '#']),
    })
}
