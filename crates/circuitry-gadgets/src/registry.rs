//! Gadget registry and trait definitions
//!
//! A gadget kind is a constructor registered under a name. Circuits ask the
//! registry for a fresh gadget whenever an add command names that kind.

use circuitry_core::{Error, Message, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a gadget wants to happen after receiving a message.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Send a message out of one of the gadget's outlets.
    Send { outlet: usize, message: Message },
    /// Hand a message out of the circuit.
    Emit(Message),
    /// Print a line of text.
    Print(String),
}

impl Effect {
    pub fn send(outlet: usize, message: Message) -> Self {
        Self::Send { outlet, message }
    }
}

/// The Gadget trait — implement this to add a new kind of node.
///
/// Effects are applied by the owning circuit in the order they are returned.
pub trait Gadget: Send {
    /// Registered kind name (e.g. "pass", "print").
    fn kind(&self) -> &str;

    /// Number of inlets. Messages for other inlet numbers are not delivered.
    fn inlets(&self) -> usize {
        1
    }

    /// Number of outlets.
    fn outlets(&self) -> usize {
        1
    }

    /// Handle a message arriving on `inlet`.
    fn receive(&mut self, inlet: usize, message: &Message) -> Vec<Effect>;
}

/// Builds a gadget from the arguments of an add command.
pub type GadgetConstructor = Arc<dyn Fn(&[Value]) -> Result<Box<dyn Gadget>> + Send + Sync>;

pub struct GadgetRegistry {
    constructors: HashMap<String, GadgetConstructor>,
}

impl Default for GadgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GadgetRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a kind. Replaces any existing constructor with the same name.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&[Value]) -> Result<Box<dyn Gadget>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.constructors.insert(kind.clone(), Arc::new(constructor)).is_some() {
            warn!("Gadget kind {} re-registered", kind);
        }
    }

    /// Remove a kind by name.
    pub fn remove(&mut self, kind: &str) -> bool {
        self.constructors.remove(kind).is_some()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Construct a gadget of `kind`. Constructor errors are passed through unchanged.
    pub fn create(&self, kind: &str, args: &[Value]) -> Result<Box<dyn Gadget>> {
        match self.constructors.get(kind) {
            Some(constructor) => {
                debug!("Constructing {} with {} args", kind, args.len());
                constructor(args)
            }
            None => Err(Error::gadget_construction(kind, "unknown gadget kind")),
        }
    }

    /// Registered kinds, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Reject arguments for kinds that take none.
pub(crate) fn expect_no_args(kind: &str, args: &[Value]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(Error::gadget_construction(
            kind,
            format!("takes no arguments, got {}", args.len()),
        ))
    }
}
