//! Core types for Circuitry

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A message travelling through a circuit. Any JSON value.
pub type Message = serde_json::Value;

/// Circuit identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CircuitName(Arc<str>);

impl CircuitName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CircuitName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CircuitName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CircuitName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Delivery guarantee requested for a subscription or publish.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// Level actually served for a request. Delivery here is at-most-once,
    /// so every request is granted `AtMostOnce`.
    pub fn granted(requested: QoS) -> QoS {
        match requested {
            QoS::AtMostOnce | QoS::AtLeastOnce | QoS::ExactlyOnce => QoS::AtMostOnce,
        }
    }
}

/// A topic filter plus the QoS it is subscribed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub filter: String,
    pub qos: QoS,
}

impl Subscription {
    pub fn at_most_once(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            qos: QoS::AtMostOnce,
        }
    }
}

/// Something a circuit produced while handling a message.
#[derive(Clone, Debug, PartialEq)]
pub enum CircuitOutput {
    /// An `outlet` gadget handed a message out of the circuit.
    Emit {
        circuit: CircuitName,
        outlet: usize,
        message: Message,
    },
    /// A `print` gadget produced a line of text.
    Print {
        circuit: CircuitName,
        gadget: usize,
        text: String,
    },
}
