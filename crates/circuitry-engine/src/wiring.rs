//! Wiring table: (gadget, outlet) to an ordered list of (gadget, inlet)

use serde::Serialize;
use std::collections::BTreeMap;

/// A numbered port on a gadget.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct Endpoint {
    pub gadget: usize,
    pub port: usize,
}

impl Endpoint {
    pub fn new(gadget: usize, port: usize) -> Self {
        Self { gadget, port }
    }
}

/// Adjacency from outlets to inlets.
///
/// Destinations keep wiring order and duplicates are kept: wiring the same
/// pair twice delivers twice.
#[derive(Clone, Debug, Default)]
pub struct WiringTable {
    routes: BTreeMap<Endpoint, Vec<Endpoint>>,
}

impl WiringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `dst` to the destinations of `src`. Index validation is the caller's job.
    pub fn connect(&mut self, src: Endpoint, dst: Endpoint) {
        self.routes.entry(src).or_default().push(dst);
    }

    pub fn destinations(&self, src: Endpoint) -> &[Endpoint] {
        self.routes.get(&src).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of connections, duplicates included.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All connections as (source outlet, destination inlet), sources in port order.
    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, Endpoint)> + '_ {
        self.routes
            .iter()
            .flat_map(|(src, dsts)| dsts.iter().map(move |dst| (*src, *dst)))
    }
}
