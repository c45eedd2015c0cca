//! Service configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists or it fails to parse.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use crate::error::{Error, Result};
use crate::protocol::{validate_circuit_name, TopicSpace};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root of the topic namespace for this deployment.
    pub prefix: String,
    /// WebSocket gateway settings.
    pub gateway: GatewayConfig,
    /// Circuits built before the transport connects.
    pub circuits: Vec<BootstrapCircuit>,
}

/// Gateway configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: BindMode,
}

fn default_port() -> u16 {
    18883
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: BindMode::default(),
        }
    }
}

/// Bind mode for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "lan" | "0.0.0.0" => BindMode::Lan,
            _ => BindMode::Loopback,
        }
    }
}

/// A circuit created at startup from a list of control commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootstrapCircuit {
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Value>,
}

impl BootstrapCircuit {
    /// The loopback circuit: inlet(0) → pass(1) → {print(2), outlet(3)}.
    pub fn loopback() -> Self {
        Self {
            name: "loop".to_string(),
            commands: vec![
                json!(["inlet"]),
                json!(["pass"]),
                json!(["print", "got:"]),
                json!(["outlet"]),
                json!([0, 0, 1, 0]),
                json!([1, 0, 2, 0]),
                json!([1, 0, 3, 0]),
            ],
        }
    }

    /// Commands as a single control payload.
    pub fn control_payload(&self) -> Value {
        Value::Array(self.commands.clone())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            prefix: "s/circuitry".to_string(),
            gateway: GatewayConfig::default(),
            circuits: vec![BootstrapCircuit::loopback()],
        }
    }
}

impl ServiceConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Reject a prefix or startup circuit names that cannot be subscribed to.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.prefix.contains(['+', '#']) {
            return Err(Error::ConfigError(format!(
                "invalid prefix {:?}: must be non-empty and free of wildcards",
                self.prefix
            )));
        }
        for circuit in &self.circuits {
            validate_circuit_name(&circuit.name)
                .map_err(|e| Error::ConfigError(format!("[[circuits]] {}", e)))?;
        }
        Ok(())
    }

    pub fn topics(&self) -> TopicSpace {
        TopicSpace::new(self.prefix.clone())
    }
}
