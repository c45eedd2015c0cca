//! Circuitry Engine - Dataflow circuits, wiring and the circuit registry

pub mod circuit;
pub mod registry;
pub mod wiring;

pub use circuit::{Circuit, CircuitSummary, GadgetSummary};
pub use registry::{CircuitRegistry, Creation};
pub use wiring::{Endpoint, WiringTable};
pub use circuitry_core::{CircuitName, CircuitOutput};
