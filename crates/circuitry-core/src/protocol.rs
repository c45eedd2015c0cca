//! Topic protocol — maps a flat pub/sub namespace onto circuits
//!
//! Topic layout, for service prefix `P` and circuit `N`:
//!
//!   P              ← ["create", N]                  (service channel)
//!   P/N            ← [[kind, args...], [s, o, d, i]] (control channel)
//!   P/N/in/{k}     ← any JSON value                 (feed gadget k)
//!   P/N/out/{k}    → JSON string, double-encoded    (emit from outlet k)
//!   registry-P     → {} retained, cleared by the last will
//!
//! Every payload is UTF-8 JSON.

use crate::error::{Error, Result};
use crate::types::{CircuitName, Message, QoS, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Topic namespace
// ---------------------------------------------------------------------------

/// The topic namespace of one service deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSpace {
    prefix: String,
}

/// Where an inbound topic points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// The service channel itself (`P`).
    Service,
    /// Control channel of a circuit (`P/N`).
    Control(CircuitName),
    /// Data input of a circuit (`P/N/in/{k}`).
    Feed { circuit: CircuitName, inlet: usize },
}

impl TopicSpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Retained liveness topic, also used as the last will.
    pub fn registry_topic(&self) -> String {
        format!("registry-{}", self.prefix)
    }

    pub fn control_topic(&self, circuit: &CircuitName) -> String {
        format!("{}/{}", self.prefix, circuit)
    }

    pub fn input_topic(&self, circuit: &CircuitName, inlet: usize) -> String {
        format!("{}/{}/in/{}", self.prefix, circuit, inlet)
    }

    pub fn output_topic(&self, circuit: &CircuitName, outlet: usize) -> String {
        format!("{}/{}/out/{}", self.prefix, circuit, outlet)
    }

    pub fn service_subscription(&self) -> Subscription {
        Subscription::at_most_once(self.prefix.clone())
    }

    /// Control topic plus all input topics of a circuit.
    pub fn circuit_subscriptions(&self, circuit: &CircuitName) -> Vec<Subscription> {
        vec![
            Subscription::at_most_once(self.control_topic(circuit)),
            Subscription::at_most_once(format!("{}/{}/in/+", self.prefix, circuit)),
        ]
    }

    /// Classify an inbound topic.
    pub fn route(&self, topic: &str) -> Result<Route> {
        if topic == self.prefix {
            return Ok(Route::Service);
        }
        let rest = topic
            .strip_prefix(self.prefix.as_str())
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| Error::malformed_topic(topic))?;

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [name] => Ok(Route::Control(CircuitName::new(*name))),
            [name, "in", port] => {
                let inlet = port
                    .parse::<usize>()
                    .map_err(|_| Error::malformed_topic(topic))?;
                Ok(Route::Feed {
                    circuit: CircuitName::new(*name),
                    inlet,
                })
            }
            _ => Err(Error::malformed_topic(topic)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload codec
// ---------------------------------------------------------------------------

/// Parse an inbound payload as JSON.
pub fn decode_payload(payload: &[u8]) -> Result<Message> {
    serde_json::from_slice(payload).map_err(|e| Error::InvalidPayload(e.to_string()))
}

/// Encode an emitted message for `P/N/out/{k}`.
///
/// The value is rendered as JSON text first and that text is then encoded
/// as a JSON string. The string `hello` goes out as the bytes `"\"hello\""`.
pub fn encode_emission(message: &Message) -> Result<Vec<u8>> {
    let text = serde_json::to_string(message)?;
    Ok(serde_json::to_vec(&Value::String(text))?)
}

/// Lossy, length-capped rendering of a raw payload for log lines.
pub fn payload_preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Service channel
// ---------------------------------------------------------------------------

/// Decode `["create", name]` from the service channel.
pub fn decode_create(payload: &Value) -> Result<CircuitName> {
    match payload.as_array().map(Vec::as_slice) {
        Some([Value::String(verb), Value::String(name)]) if verb == "create" => {
            validate_circuit_name(name)?;
            Ok(CircuitName::new(name.as_str()))
        }
        _ => Err(Error::malformed_control(format!(
            "expected [\"create\", name], got {}",
            payload
        ))),
    }
}

/// A circuit name is one non-empty topic level without wildcards.
pub fn validate_circuit_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '+', '#']) {
        return Err(Error::malformed_control(format!(
            "invalid circuit name {:?}: must be one topic level without wildcards",
            name
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Control channel
// ---------------------------------------------------------------------------

/// One decoded control instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    /// `[kind, args...]`
    Add { kind: String, args: Vec<Value> },
    /// `[src, src_outlet, dst, dst_inlet]`
    Wire {
        src: usize,
        src_outlet: usize,
        dst: usize,
        dst_inlet: usize,
    },
}

impl ControlCommand {
    /// Decode a single command, dispatching on the kind of its first element.
    pub fn decode(value: &Value) -> Result<Self> {
        let items = match value.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => {
                return Err(Error::malformed_control(format!(
                    "command must be a non-empty list, got {}",
                    value
                )))
            }
        };

        match &items[0] {
            Value::String(kind) => Ok(Self::Add {
                kind: kind.clone(),
                args: items[1..].to_vec(),
            }),
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                let ports = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| usize::try_from(n).ok()))
                    .collect::<Option<Vec<_>>>();
                match ports.as_deref() {
                    Some(&[src, src_outlet, dst, dst_inlet]) => Ok(Self::Wire {
                        src,
                        src_outlet,
                        dst,
                        dst_inlet,
                    }),
                    _ => Err(Error::malformed_control(format!(
                        "wire command needs four non-negative integers, got {}",
                        value
                    ))),
                }
            }
            other => Err(Error::malformed_control(format!(
                "command must start with a kind or a gadget index, got {}",
                other
            ))),
        }
    }
}

/// Borrow the command list of a control payload without decoding the commands.
///
/// Commands are decoded one at a time while being applied, so a bad entry
/// only stops the batch at that point.
pub fn control_batch(payload: &Value) -> Result<&[Value]> {
    payload.as_array().map(Vec::as_slice).ok_or_else(|| {
        Error::malformed_control(format!("control payload must be a list, got {}", payload))
    })
}

// ---------------------------------------------------------------------------
// WebSocket gateway frames
// ---------------------------------------------------------------------------

/// Client → gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientFrame {
    Publish {
        topic: String,
        payload: String,
        #[serde(default)]
        retain: bool,
    },
    Subscribe {
        filters: Vec<String>,
        /// Requested level; the in-process broker grants at-most-once.
        #[serde(default)]
        qos: QoS,
    },
    Unsubscribe { filters: Vec<String> },
    Ping,
}

/// Gateway → client frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    pub event: String,
    pub data: Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// A message delivered on a subscribed topic.
    pub fn message(topic: &str, payload: &[u8]) -> Self {
        Self::new(
            "message",
            serde_json::json!({
                "topic": topic,
                "payload": String::from_utf8_lossy(payload),
            }),
        )
    }

    /// Info event (sent on connection).
    pub fn info(version: &str, prefix: &str, client_id: &str) -> Self {
        Self::new(
            "info",
            serde_json::json!({ "version": version, "prefix": prefix, "client_id": client_id }),
        )
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::new("error", serde_json::json!({ "message": message.to_string() }))
    }

    pub fn pong() -> Self {
        Self::new("pong", serde_json::json!({}))
    }

    /// Topic and payload text of a `message` event.
    pub fn as_delivery(&self) -> Option<(&str, &str)> {
        if self.event != "message" {
            return None;
        }
        Some((self.data["topic"].as_str()?, self.data["payload"].as_str()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_rejects_foreign_prefix() {
        let space = TopicSpace::new("s/demo");
        assert!(matches!(
            space.route("s/demox/loop"),
            Err(Error::MalformedTopic(_))
        ));
        assert!(matches!(space.route("other"), Err(Error::MalformedTopic(_))));
    }

    #[test]
    fn float_first_element_is_malformed() {
        let err = ControlCommand::decode(&json!([1.5, 0, 1, 0])).unwrap_err();
        assert!(matches!(err, Error::MalformedControl(_)));
    }

    #[test]
    fn preview_caps_long_payloads() {
        let long = "x".repeat(500);
        let preview = payload_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), 203);
    }
}
