//! Circuitry Gadgets — modular gadget implementations
//!
//! Each gadget kind is a self-contained file in src/gadgets/.
//! To add a kind: create the file, implement the Gadget trait, register below.

pub mod gadgets;
pub mod registry;

pub use registry::{Effect, Gadget, GadgetConstructor, GadgetRegistry};

/// Create the gadget registry with all builtin kinds.
pub fn create_default_registry() -> GadgetRegistry {
    let mut registry = GadgetRegistry::new();

    // --- Circuit boundary ---
    registry.register("inlet", gadgets::inlet::InletGadget::construct);
    registry.register("outlet", gadgets::outlet::OutletGadget::construct);

    // --- Processing ---
    registry.register("pass", gadgets::pass::PassGadget::construct);
    registry.register("print", gadgets::print::PrintGadget::construct);

    registry
}
