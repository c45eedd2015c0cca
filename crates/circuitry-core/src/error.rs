//! Error types for Circuitry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed control: {0}")]
    MalformedControl(String),

    #[error("malformed topic: {0}")]
    MalformedTopic(String),

    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),

    #[error("invalid reference: gadget {index} does not exist ({count} gadgets)")]
    InvalidReference { index: usize, count: usize },

    #[error("gadget construction failed: {kind} - {message}")]
    GadgetConstruction { kind: String, message: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed_control(reason: impl Into<String>) -> Self {
        Self::MalformedControl(reason.into())
    }

    pub fn malformed_topic(topic: impl Into<String>) -> Self {
        Self::MalformedTopic(topic.into())
    }

    pub fn gadget_construction(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GadgetConstruction {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Short, stable name of the error class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedControl(_) => "malformed_control",
            Self::MalformedTopic(_) => "malformed_topic",
            Self::UnknownCircuit(_) => "unknown_circuit",
            Self::InvalidReference { .. } => "invalid_reference",
            Self::GadgetConstruction { .. } => "gadget_construction",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Transport(_) => "transport",
            Self::ConfigError(_) => "config",
            Self::IoError(_) => "io",
            Self::JsonError(_) => "json",
        }
    }
}
