//! Named circuits of the process
//!
//! Owned by the dispatch task and handed to the router; circuits are only
//! ever added, never removed.

use crate::circuit::Circuit;
use circuitry_core::{validate_circuit_name, BootstrapCircuit, CircuitName, Error, Result};
use circuitry_gadgets::GadgetRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Outcome of a create request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Creation {
    Created,
    Existing,
}

pub struct CircuitRegistry {
    circuits: BTreeMap<CircuitName, Circuit>,
    kinds: Arc<GadgetRegistry>,
}

impl CircuitRegistry {
    pub fn new(kinds: GadgetRegistry) -> Self {
        Self {
            circuits: BTreeMap::new(),
            kinds: Arc::new(kinds),
        }
    }

    /// Gadget kinds available to circuits in this registry.
    pub fn kinds(&self) -> &GadgetRegistry {
        &self.kinds
    }

    /// Create `name` unless it exists. An existing circuit is left untouched.
    pub fn create(&mut self, name: &CircuitName) -> Creation {
        if self.circuits.contains_key(name) {
            return Creation::Existing;
        }
        let circuit = Circuit::new(name.clone(), self.kinds.clone());
        self.circuits.insert(name.clone(), circuit);
        info!("Circuit {} created", name);
        Creation::Created
    }

    /// Create a circuit and apply its startup commands.
    pub fn bootstrap(&mut self, startup: &BootstrapCircuit) -> Result<&Circuit> {
        validate_circuit_name(&startup.name)?;
        let name = CircuitName::new(startup.name.as_str());
        self.create(&name);
        let circuit = self.get_mut(&name)?;
        circuit.control(&startup.control_payload())?;
        Ok(&*circuit)
    }

    pub fn get(&self, name: &CircuitName) -> Result<&Circuit> {
        self.circuits
            .get(name)
            .ok_or_else(|| Error::UnknownCircuit(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &CircuitName) -> Result<&mut Circuit> {
        self.circuits
            .get_mut(name)
            .ok_or_else(|| Error::UnknownCircuit(name.to_string()))
    }

    pub fn contains(&self, name: &CircuitName) -> bool {
        self.circuits.contains_key(name)
    }

    /// Circuit names, sorted.
    pub fn names(&self) -> Vec<CircuitName> {
        self.circuits.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Circuit> {
        self.circuits.values()
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}
