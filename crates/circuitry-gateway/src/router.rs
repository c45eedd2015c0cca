//! Protocol router — transport callbacks to circuit operations
//!
//! Inbound (topic, payload) pairs are decoded, routed to the circuit registry
//! and applied. Whatever goes wrong with a single message is logged with the
//! topic and raw payload and the message is dropped; the router keeps going.

use crate::transport::Transport;
use bytes::Bytes;
use circuitry_core::{
    decode_create, decode_payload, encode_emission, payload_preview, BootstrapCircuit,
    CircuitName, CircuitOutput, Result, Route, Subscription, TopicSpace,
};
use circuitry_engine::{CircuitRegistry, CircuitSummary, Creation};
use tracing::{debug, info, warn};

pub struct ProtocolRouter {
    topics: TopicSpace,
    circuits: CircuitRegistry,
    handled: u64,
    dropped: u64,
    /// Bumped whenever a create or control message may have changed a graph.
    revision: u64,
    echo_prints: bool,
}

impl ProtocolRouter {
    pub fn new(topics: TopicSpace, circuits: CircuitRegistry) -> Self {
        Self {
            topics,
            circuits,
            handled: 0,
            dropped: 0,
            revision: 0,
            echo_prints: true,
        }
    }

    /// Whether `print` output is written to stdout as well as logged.
    pub fn with_echo_prints(mut self, echo: bool) -> Self {
        self.echo_prints = echo;
        self
    }

    pub fn topics(&self) -> &TopicSpace {
        &self.topics
    }

    pub fn circuits(&self) -> &CircuitRegistry {
        &self.circuits
    }

    /// Messages applied successfully / dropped so far.
    pub fn counters(&self) -> (u64, u64) {
        (self.handled, self.dropped)
    }

    /// Changes whenever circuit summaries may have changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Build startup circuits before the transport connects.
    pub fn bootstrap(&mut self, circuits: &[BootstrapCircuit]) -> Result<()> {
        for startup in circuits {
            self.revision += 1;
            let circuit = self.circuits.bootstrap(startup)?;
            info!(
                "Bootstrapped circuit {} ({} gadgets, {} wires)",
                circuit.name(),
                circuit.len(),
                circuit.wiring().len()
            );
        }
        Ok(())
    }

    /// Everything the router must be subscribed to right now.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subs = vec![self.topics.service_subscription()];
        for name in self.circuits.names() {
            subs.extend(self.topics.circuit_subscriptions(&name));
        }
        subs
    }

    pub fn summaries(&self) -> Vec<CircuitSummary> {
        self.circuits.iter().map(|c| c.summary()).collect()
    }

    /// Connection callback: resubscribe everything and announce liveness.
    ///
    /// The service topic and each circuit are subscribed separately so one
    /// rejected filter cannot take the others down with it.
    pub fn on_connect(&mut self, transport: &dyn Transport, code: u8) {
        info!("Connected: code {}", code);
        let mut groups = vec![vec![self.topics.service_subscription()]];
        for name in self.circuits.names() {
            groups.push(self.topics.circuit_subscriptions(&name));
        }

        let mut subscribed = 0;
        for subs in &groups {
            match transport.subscribe(subs) {
                Ok(()) => subscribed += subs.len(),
                Err(e) => {
                    let filters: Vec<&str> = subs.iter().map(|s| s.filter.as_str()).collect();
                    warn!("Subscribe to {:?} failed: {}", filters, e);
                }
            }
        }
        debug!("Subscribed to {} topic filters", subscribed);

        let registry_topic = self.topics.registry_topic();
        if let Err(e) = transport.publish(&registry_topic, Bytes::from_static(b"{}"), true) {
            warn!("Failed to announce on {}: {}", registry_topic, e);
        }
    }

    /// Message callback. Errors are reported here and never escape.
    pub fn on_message(&mut self, transport: &dyn Transport, topic: &str, payload: &[u8]) {
        match self.dispatch(transport, topic, payload) {
            Ok(_) => self.handled += 1,
            Err(e) => {
                self.dropped += 1;
                warn!(
                    error_kind = e.kind(),
                    "{} ({:?}, {:?})",
                    e,
                    topic,
                    payload_preview(payload)
                );
            }
        }
    }

    /// Decode and apply one inbound message. Returns what the circuit produced.
    pub fn dispatch(
        &mut self,
        transport: &dyn Transport,
        topic: &str,
        payload: &[u8],
    ) -> Result<Vec<CircuitOutput>> {
        let payload = decode_payload(payload)?;

        match self.topics.route(topic)? {
            Route::Service => {
                info!("CMD: {}", payload);
                let name = decode_create(&payload)?;
                self.revision += 1;
                self.create(transport, &name)?;
                Ok(Vec::new())
            }
            Route::Control(name) => {
                info!("CONTROL: {} {}", name, payload);
                self.revision += 1;
                self.circuits.get_mut(&name)?.control(&payload)?;
                Ok(Vec::new())
            }
            Route::Feed { circuit, inlet } => {
                let outputs = self.circuits.get_mut(&circuit)?.feed(inlet, payload);
                self.forward(transport, &outputs);
                Ok(outputs)
            }
        }
    }

    /// Create a circuit if absent and (re)subscribe its topics.
    fn create(&mut self, transport: &dyn Transport, name: &CircuitName) -> Result<Creation> {
        let creation = self.circuits.create(name);
        if creation == Creation::Existing {
            debug!("Circuit {} already exists, resubscribing", name);
        }
        transport.subscribe(&self.topics.circuit_subscriptions(name))?;
        Ok(creation)
    }

    /// Publish emissions and show prints, in the order they were produced.
    fn forward(&self, transport: &dyn Transport, outputs: &[CircuitOutput]) {
        for output in outputs {
            match output {
                CircuitOutput::Emit {
                    circuit,
                    outlet,
                    message,
                } => {
                    let topic = self.topics.output_topic(circuit, *outlet);
                    let published = encode_emission(message)
                        .and_then(|bytes| transport.publish(&topic, Bytes::from(bytes), false));
                    if let Err(e) = published {
                        warn!("Emit on {} failed: {}", topic, e);
                    }
                }
                CircuitOutput::Print {
                    circuit,
                    gadget,
                    text,
                } => {
                    info!("{}[{}] print: {}", circuit, gadget, text);
                    if self.echo_prints {
                        println!("{}", text);
                    }
                }
            }
        }
    }
}
