//! Tests for circuitry-engine: Circuit graph mutation, propagation, and CircuitRegistry

use circuitry_core::{BootstrapCircuit, Error};
use circuitry_engine::*;
use circuitry_gadgets::{create_default_registry, Effect, Gadget, GadgetRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

fn circuit(name: &str) -> Circuit {
    Circuit::new(CircuitName::new(name), Arc::new(create_default_registry()))
}

fn loopback() -> Circuit {
    let mut c = circuit("loop");
    c.add("inlet", vec![]).unwrap();
    c.add("pass", vec![]).unwrap();
    c.add("print", vec![json!("got:")]).unwrap();
    c.add("outlet", vec![]).unwrap();
    c.wire(0, 0, 1, 0).unwrap();
    c.wire(1, 0, 2, 0).unwrap();
    c.wire(1, 0, 3, 0).unwrap();
    c
}

fn emitted(outputs: &[CircuitOutput]) -> Vec<(usize, Value)> {
    outputs
        .iter()
        .filter_map(|o| match o {
            CircuitOutput::Emit { outlet, message, .. } => Some((*outlet, message.clone())),
            _ => None,
        })
        .collect()
}

// ===========================================================================
// add
// ===========================================================================

#[test]
fn add_assigns_dense_indices_in_order() {
    let mut c = circuit("c");
    let kinds = ["inlet", "pass", "pass", "print", "outlet"];
    for (expected, kind) in kinds.iter().enumerate() {
        assert_eq!(c.add(kind, vec![]).unwrap(), expected);
    }
    assert_eq!(c.len(), 5);
    for (index, kind) in kinds.iter().enumerate() {
        assert_eq!(c.kind_of(index), Some(*kind));
    }
}

#[test]
fn add_unknown_kind_fails_without_consuming_an_index() {
    let mut c = circuit("c");
    assert!(matches!(
        c.add("blah", vec![]),
        Err(Error::GadgetConstruction { .. })
    ));
    assert!(c.is_empty());
    assert_eq!(c.add("pass", vec![]).unwrap(), 0);
}

// ===========================================================================
// wire
// ===========================================================================

#[test]
fn wire_dangling_reference_leaves_table_unchanged() {
    let mut c = circuit("c");
    c.add("inlet", vec![]).unwrap();
    c.add("outlet", vec![]).unwrap();
    c.wire(0, 0, 1, 0).unwrap();

    let err = c.wire(0, 0, 5, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidReference { index: 5, count: 2 }));
    let err = c.wire(5, 0, 1, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidReference { index: 5, count: 2 }));
    assert_eq!(c.wiring().len(), 1);
}

#[test]
fn duplicate_wires_deliver_twice() {
    let mut c = circuit("c");
    c.add("inlet", vec![]).unwrap();
    c.add("outlet", vec![]).unwrap();
    c.wire(0, 0, 1, 0).unwrap();
    c.wire(0, 0, 1, 0).unwrap();

    let outputs = c.feed(0, json!("x"));
    assert_eq!(emitted(&outputs), vec![(1, json!("x")), (1, json!("x"))]);
}

// ===========================================================================
// control
// ===========================================================================

#[test]
fn control_adds_and_wires() {
    let mut c = circuit("c");
    let applied = c
        .control(&json!([["inlet"], ["outlet"], [0, 0, 1, 0]]))
        .unwrap();
    assert_eq!(applied, 3);
    assert_eq!(c.len(), 2);
    assert_eq!(
        c.wiring().iter().collect::<Vec<_>>(),
        vec![(Endpoint::new(0, 0), Endpoint::new(1, 0))]
    );
}

#[test]
fn control_is_not_transactional() {
    let mut c = circuit("c");
    let err = c
        .control(&json!([["inlet"], ["pass"], [], ["outlet"]]))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedControl(_)));
    // The two commands before the bad one stay applied, the one after never ran.
    assert_eq!(c.len(), 2);
}

#[test]
fn control_stops_at_invalid_reference() {
    let mut c = circuit("c");
    let err = c
        .control(&json!([["inlet"], [0, 0, 5, 0], ["outlet"]]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidReference { .. }));
    assert_eq!(c.len(), 1);
    assert!(c.wiring().is_empty());
}

#[test]
fn control_rejects_non_list_payload() {
    let mut c = circuit("c");
    assert!(matches!(
        c.control(&json!({"add": "inlet"})),
        Err(Error::MalformedControl(_))
    ));
    assert!(matches!(
        c.control(&json!(["inlet"])),
        Err(Error::MalformedControl(_))
    ));
    assert!(c.is_empty());
}

#[test]
fn control_empty_batch_is_fine() {
    let mut c = circuit("c");
    assert_eq!(c.control(&json!([])).unwrap(), 0);
}

// ===========================================================================
// feed / propagation
// ===========================================================================

#[test]
fn loopback_feed_prints_then_emits() {
    let mut c = loopback();
    let outputs = c.feed(0, json!("hello"));
    assert_eq!(
        outputs,
        vec![
            CircuitOutput::Print {
                circuit: CircuitName::new("loop"),
                gadget: 2,
                text: "got: hello".into(),
            },
            CircuitOutput::Emit {
                circuit: CircuitName::new("loop"),
                outlet: 3,
                message: json!("hello"),
            },
        ]
    );
}

#[test]
fn feed_missing_gadget_is_noop() {
    let mut c = loopback();
    assert!(c.feed(9, json!("x")).is_empty());
}

#[test]
fn feed_unwired_gadget_is_noop() {
    let mut c = circuit("c");
    c.add("inlet", vec![]).unwrap();
    assert!(c.feed(0, json!("x")).is_empty());
}

#[test]
fn feed_addresses_gadget_index_directly() {
    let mut c = loopback();
    // Skipping the inlet gadget: pass at index 1 still fans out.
    let outputs = c.feed(1, json!(7));
    assert_eq!(outputs.len(), 2);
    assert_eq!(emitted(&outputs), vec![(3, json!(7))]);
}

#[test]
fn wire_to_missing_inlet_is_ignored() {
    let mut c = circuit("c");
    c.add("inlet", vec![]).unwrap();
    c.add("outlet", vec![]).unwrap();
    c.wire(0, 0, 1, 4).unwrap();
    assert!(c.feed(0, json!("x")).is_empty());
}

/// Emits on outlet 0, then outlet 1, recording nothing itself.
struct Splitter;

impl Gadget for Splitter {
    fn kind(&self) -> &str {
        "split"
    }
    fn outlets(&self) -> usize {
        2
    }
    fn receive(&mut self, _inlet: usize, message: &Value) -> Vec<Effect> {
        vec![
            Effect::send(0, json!(["a", message])),
            Effect::send(1, json!(["b", message])),
        ]
    }
}

#[test]
fn propagation_is_depth_first_in_wiring_order() {
    let mut kinds = create_default_registry();
    kinds.register("split", |_args: &[Value]| Ok(Box::new(Splitter) as Box<dyn Gadget>));
    let mut c = Circuit::new(CircuitName::new("df"), Arc::new(kinds));

    c.add("inlet", vec![]).unwrap(); // 0
    c.add("split", vec![]).unwrap(); // 1
    c.add("pass", vec![]).unwrap(); // 2
    c.add("outlet", vec![]).unwrap(); // 3
    c.add("outlet", vec![]).unwrap(); // 4
    c.wire(0, 0, 1, 0).unwrap();
    c.wire(1, 0, 2, 0).unwrap();
    c.wire(2, 0, 3, 0).unwrap();
    c.wire(1, 1, 4, 0).unwrap();
    c.wire(0, 0, 4, 0).unwrap();

    let outputs = c.feed(0, json!(1));
    assert_eq!(
        emitted(&outputs),
        vec![
            (3, json!(["a", 1])),
            (4, json!(["b", 1])),
            (4, json!(1)),
        ]
    );
}

#[test]
fn summary_describes_graph() {
    let c = loopback();
    let summary = c.summary();
    assert_eq!(summary.name, "loop");
    assert_eq!(summary.gadgets.len(), 4);
    assert_eq!(summary.gadgets[2].kind, "print");
    assert_eq!(summary.gadgets[2].args, vec![json!("got:")]);
    assert_eq!(summary.wires, vec![[0, 0, 1, 0], [1, 0, 2, 0], [1, 0, 3, 0]]);
}

// ===========================================================================
// CircuitRegistry
// ===========================================================================

#[test]
fn registry_create_is_idempotent() {
    let mut reg = CircuitRegistry::new(create_default_registry());
    let name = CircuitName::new("a");
    assert_eq!(reg.create(&name), Creation::Created);
    reg.get_mut(&name)
        .unwrap()
        .control(&json!([["inlet"], ["outlet"], [0, 0, 1, 0]]))
        .unwrap();

    assert_eq!(reg.create(&name), Creation::Existing);
    let c = reg.get(&name).unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(c.wiring().len(), 1);
    assert_eq!(reg.len(), 1);
}

#[test]
fn registry_unknown_circuit() {
    let mut reg = CircuitRegistry::new(create_default_registry());
    let name = CircuitName::new("ghost");
    assert!(matches!(reg.get(&name), Err(Error::UnknownCircuit(n)) if n == "ghost"));
    assert!(reg.get_mut(&name).is_err());
    assert!(!reg.contains(&name));
    assert!(reg.is_empty());
}

#[test]
fn registry_bootstrap_loopback() {
    let mut reg = CircuitRegistry::new(create_default_registry());
    let c = reg.bootstrap(&BootstrapCircuit::loopback()).unwrap();
    assert_eq!(c.len(), 4);
    assert_eq!(c.wiring().len(), 3);
    assert_eq!(reg.names(), vec![CircuitName::new("loop")]);
}

#[test]
fn registry_names_sorted() {
    let mut reg = CircuitRegistry::new(GadgetRegistry::new());
    for n in ["b", "c", "a"] {
        reg.create(&CircuitName::new(n));
    }
    let names: Vec<String> = reg.names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(reg.iter().count(), 3);
    assert!(reg.kinds().list().is_empty());
}
