//! Circuit — an ordered set of gadgets plus their wiring
//!
//! Messages propagate synchronously and depth-first: everything a delivery
//! causes, nested deliveries included, finishes before the next sibling
//! destination is served. A wiring cycle recurses without bound.

use crate::wiring::{Endpoint, WiringTable};
use circuitry_core::{
    control_batch, CircuitName, CircuitOutput, ControlCommand, Error, Message, Result,
};
use circuitry_gadgets::{Effect, Gadget, GadgetRegistry};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

struct Slot {
    kind: String,
    args: Vec<Value>,
    gadget: Box<dyn Gadget>,
}

pub struct Circuit {
    name: CircuitName,
    gadgets: Vec<Slot>,
    wiring: WiringTable,
    kinds: Arc<GadgetRegistry>,
}

/// Serializable snapshot of a circuit's graph.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CircuitSummary {
    pub name: String,
    pub gadgets: Vec<GadgetSummary>,
    pub wires: Vec<[usize; 4]>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GadgetSummary {
    pub index: usize,
    pub kind: String,
    pub args: Vec<Value>,
}

impl Circuit {
    pub fn new(name: CircuitName, kinds: Arc<GadgetRegistry>) -> Self {
        Self {
            name,
            gadgets: Vec::new(),
            wiring: WiringTable::new(),
            kinds,
        }
    }

    pub fn name(&self) -> &CircuitName {
        &self.name
    }

    /// Number of gadgets.
    pub fn len(&self) -> usize {
        self.gadgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gadgets.is_empty()
    }

    pub fn wiring(&self) -> &WiringTable {
        &self.wiring
    }

    /// Kind of the gadget at `index`.
    pub fn kind_of(&self, index: usize) -> Option<&str> {
        self.gadgets.get(index).map(|slot| slot.kind.as_str())
    }

    /// Construct a gadget of `kind` and append it. Returns its index.
    pub fn add(&mut self, kind: &str, args: Vec<Value>) -> Result<usize> {
        let gadget = self.kinds.create(kind, &args)?;
        let index = self.gadgets.len();
        self.gadgets.push(Slot {
            kind: kind.to_string(),
            args,
            gadget,
        });
        debug!("{}: added {} as gadget {}", self.name, kind, index);
        Ok(index)
    }

    /// Connect outlet `src_outlet` of gadget `src` to inlet `dst_inlet` of gadget `dst`.
    pub fn wire(&mut self, src: usize, src_outlet: usize, dst: usize, dst_inlet: usize) -> Result<()> {
        let count = self.gadgets.len();
        for index in [src, dst] {
            if index >= count {
                return Err(Error::InvalidReference { index, count });
            }
        }
        self.wiring
            .connect(Endpoint::new(src, src_outlet), Endpoint::new(dst, dst_inlet));
        debug!(
            "{}: wired {}:{} -> {}:{}",
            self.name, src, src_outlet, dst, dst_inlet
        );
        Ok(())
    }

    pub fn apply(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Add { kind, args } => self.add(&kind, args).map(|_| ()),
            ControlCommand::Wire {
                src,
                src_outlet,
                dst,
                dst_inlet,
            } => self.wire(src, src_outlet, dst, dst_inlet),
        }
    }

    /// Apply a batch of control commands in order.
    ///
    /// Not transactional: when a command fails, the ones before it stay applied.
    /// Returns the number of commands applied.
    pub fn control(&mut self, payload: &Value) -> Result<usize> {
        let batch = control_batch(payload)?;
        info!("{}: control batch of {} commands", self.name, batch.len());
        for (applied, raw) in batch.iter().enumerate() {
            let command = ControlCommand::decode(raw)?;
            if let Err(e) = self.apply(command) {
                debug!("{}: control stopped after {} commands", self.name, applied);
                return Err(e);
            }
        }
        Ok(batch.len())
    }

    /// Deliver `message` to inlet 0 of the gadget at `index`.
    ///
    /// Feeding an index with no gadget is a no-op.
    pub fn feed(&mut self, index: usize, message: Message) -> Vec<CircuitOutput> {
        let mut outputs = Vec::new();
        if index >= self.gadgets.len() {
            debug!("{}: feed to missing gadget {} dropped", self.name, index);
            return outputs;
        }
        self.deliver(Endpoint::new(index, 0), &message, &mut outputs);
        outputs
    }

    /// Send `message` to every destination of `src`, in wiring order.
    fn propagate(&mut self, src: Endpoint, message: &Message, outputs: &mut Vec<CircuitOutput>) {
        let destinations = self.wiring.destinations(src).to_vec();
        for dst in destinations {
            self.deliver(dst, message, outputs);
        }
    }

    fn deliver(&mut self, dst: Endpoint, message: &Message, outputs: &mut Vec<CircuitOutput>) {
        let Some(slot) = self.gadgets.get_mut(dst.gadget) else {
            return;
        };
        if dst.port >= slot.gadget.inlets() {
            debug!(
                "{}: {} gadget {} has no inlet {}",
                self.name, slot.kind, dst.gadget, dst.port
            );
            return;
        }
        let outlets = slot.gadget.outlets();
        let effects = slot.gadget.receive(dst.port, message);

        for effect in effects {
            match effect {
                Effect::Send { outlet, message } => {
                    if outlet >= outlets {
                        debug!(
                            "{}: gadget {} sent on missing outlet {}",
                            self.name, dst.gadget, outlet
                        );
                        continue;
                    }
                    self.propagate(Endpoint::new(dst.gadget, outlet), &message, outputs);
                }
                Effect::Emit(message) => outputs.push(self.emit(dst.gadget, message)),
                Effect::Print(text) => outputs.push(CircuitOutput::Print {
                    circuit: self.name.clone(),
                    gadget: dst.gadget,
                    text,
                }),
            }
        }
    }

    /// Tag a message leaving the circuit through `outlet`.
    pub fn emit(&self, outlet: usize, message: Message) -> CircuitOutput {
        CircuitOutput::Emit {
            circuit: self.name.clone(),
            outlet,
            message,
        }
    }

    pub fn summary(&self) -> CircuitSummary {
        CircuitSummary {
            name: self.name.to_string(),
            gadgets: self
                .gadgets
                .iter()
                .enumerate()
                .map(|(index, slot)| GadgetSummary {
                    index,
                    kind: slot.kind.clone(),
                    args: slot.args.clone(),
                })
                .collect(),
            wires: self
                .wiring
                .iter()
                .map(|(src, dst)| [src.gadget, src.port, dst.gadget, dst.port])
                .collect(),
        }
    }
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circuit")
            .field("name", &self.name)
            .field("gadgets", &self.gadgets.len())
            .field("wires", &self.wiring.len())
            .finish()
    }
}
