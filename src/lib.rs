//! Circuitry — dataflow circuits of gadgets, driven over pub/sub topics
//!
//! This crate re-exports the workspace so embedders need one dependency:
//!
//! - [`protocol`]: topic layout, payload codec, control commands, config
//! - [`gadgets`]: the `Gadget` trait and the built-in kinds
//! - [`engine`]: circuits, wiring and the circuit registry
//! - [`gateway`]: transport seam, in-process broker, router and WebSocket gateway

pub use circuitry_core as protocol;
pub use circuitry_engine as engine;
pub use circuitry_gadgets as gadgets;
pub use circuitry_gateway as gateway;

pub use circuitry_core::{
    BootstrapCircuit, CircuitName, CircuitOutput, Error, Message, Result, ServiceConfig,
    TopicSpace,
};
pub use circuitry_engine::{Circuit, CircuitRegistry, Creation};
pub use circuitry_gadgets::{create_default_registry, Effect, Gadget, GadgetRegistry};
pub use circuitry_gateway::{Broker, ProtocolRouter, Transport, TransportEvent};

/// Router over `prefix` with the built-in gadget kinds and no circuits.
pub fn default_router(prefix: impl Into<String>) -> ProtocolRouter {
    ProtocolRouter::new(
        TopicSpace::new(prefix),
        CircuitRegistry::new(create_default_registry()),
    )
}
