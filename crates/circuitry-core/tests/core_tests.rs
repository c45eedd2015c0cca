//! Tests for circuitry-core: types, topic routing, control decoding, config

use circuitry_core::*;
use serde_json::json;

// ===========================================================================
// CircuitName
// ===========================================================================

#[test]
fn circuit_name_new_and_display() {
    let name = CircuitName::new("loop");
    assert_eq!(name.as_str(), "loop");
    assert_eq!(format!("{}", name), "loop");
}

#[test]
fn circuit_name_equality_and_hash() {
    use std::collections::HashSet;
    let a = CircuitName::new("same");
    let b: CircuitName = "same".into();
    let c: CircuitName = String::from("other").into();
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

// ===========================================================================
// TopicSpace
// ===========================================================================

#[test]
fn topic_layout() {
    let space = TopicSpace::new("s/pyf-demo");
    let loop_name = CircuitName::new("loop");
    assert_eq!(space.registry_topic(), "registry-s/pyf-demo");
    assert_eq!(space.control_topic(&loop_name), "s/pyf-demo/loop");
    assert_eq!(space.input_topic(&loop_name, 0), "s/pyf-demo/loop/in/0");
    assert_eq!(space.output_topic(&loop_name, 3), "s/pyf-demo/loop/out/3");
}

#[test]
fn circuit_subscriptions_cover_control_and_inputs() {
    let space = TopicSpace::new("s/demo");
    let subs = space.circuit_subscriptions(&CircuitName::new("loop"));
    let filters: Vec<&str> = subs.iter().map(|s| s.filter.as_str()).collect();
    assert_eq!(filters, vec!["s/demo/loop", "s/demo/loop/in/+"]);
    assert!(subs.iter().all(|s| s.qos == QoS::AtMostOnce));
    assert_eq!(space.service_subscription().filter, "s/demo");
}

#[test]
fn route_service_topic() {
    let space = TopicSpace::new("s/demo");
    assert_eq!(space.route("s/demo").unwrap(), Route::Service);
}

#[test]
fn route_control_topic() {
    let space = TopicSpace::new("s/demo");
    assert_eq!(
        space.route("s/demo/loop").unwrap(),
        Route::Control(CircuitName::new("loop"))
    );
}

#[test]
fn route_feed_topic() {
    let space = TopicSpace::new("s/demo");
    assert_eq!(
        space.route("s/demo/loop/in/2").unwrap(),
        Route::Feed {
            circuit: CircuitName::new("loop"),
            inlet: 2
        }
    );
}

#[test]
fn route_rejects_other_shapes() {
    let space = TopicSpace::new("s/demo");
    for topic in [
        "s/demo/loop/out/3",
        "s/demo/loop/in",
        "s/demo/loop/in/x",
        "s/demo/loop/in/-1",
        "s/demo/loop/in/1/2",
        "s/demo/loop/feed/1",
        "elsewhere/loop",
    ] {
        assert!(
            matches!(space.route(topic), Err(Error::MalformedTopic(_))),
            "expected malformed topic for {}",
            topic
        );
    }
}

// ===========================================================================
// Payload codec
// ===========================================================================

#[test]
fn decode_payload_accepts_any_json() {
    assert_eq!(decode_payload(b"\"hello\"").unwrap(), json!("hello"));
    assert_eq!(decode_payload(b"[1, 2]").unwrap(), json!([1, 2]));
    assert_eq!(decode_payload(b"42").unwrap(), json!(42));
}

#[test]
fn decode_payload_rejects_garbage() {
    let err = decode_payload(b"{not json").unwrap_err();
    assert!(matches!(err, Error::InvalidPayload(_)));
    assert_eq!(err.kind(), "invalid_payload");
}

#[test]
fn emission_is_double_encoded() {
    let bytes = encode_emission(&json!("hello")).unwrap();
    assert_eq!(bytes, br#""\"hello\"""#.to_vec());

    // Decoding once yields the JSON text of the value, decoding that yields the value.
    let outer: String = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(outer, "\"hello\"");
    let inner: serde_json::Value = serde_json::from_str(&outer).unwrap();
    assert_eq!(inner, json!("hello"));
}

#[test]
fn emission_of_structured_value() {
    let bytes = encode_emission(&json!({"a": [1, 2]})).unwrap();
    let outer: String = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(outer, r#"{"a":[1,2]}"#);
}

// ===========================================================================
// Service channel
// ===========================================================================

#[test]
fn decode_create_command() {
    let name = decode_create(&json!(["create", "loop"])).unwrap();
    assert_eq!(name.as_str(), "loop");
}

#[test]
fn decode_create_rejects_other_shapes() {
    for payload in [
        json!(["create"]),
        json!(["create", "a", "b"]),
        json!(["destroy", "loop"]),
        json!(["create", 7]),
        json!({"create": "loop"}),
        json!("create"),
    ] {
        assert!(
            matches!(decode_create(&payload), Err(Error::MalformedControl(_))),
            "expected malformed control for {}",
            payload
        );
    }
}

// ===========================================================================
// Control commands
// ===========================================================================

#[test]
fn decode_add_command() {
    let cmd = ControlCommand::decode(&json!(["print", "got:", 3])).unwrap();
    assert_eq!(
        cmd,
        ControlCommand::Add {
            kind: "print".into(),
            args: vec![json!("got:"), json!(3)],
        }
    );
}

#[test]
fn decode_add_without_args() {
    let cmd = ControlCommand::decode(&json!(["inlet"])).unwrap();
    assert_eq!(
        cmd,
        ControlCommand::Add {
            kind: "inlet".into(),
            args: vec![],
        }
    );
}

#[test]
fn decode_wire_command() {
    let cmd = ControlCommand::decode(&json!([0, 0, 1, 0])).unwrap();
    assert_eq!(
        cmd,
        ControlCommand::Wire {
            src: 0,
            src_outlet: 0,
            dst: 1,
            dst_inlet: 0,
        }
    );
}

#[test]
fn decode_rejects_malformed_commands() {
    for value in [
        json!([]),
        json!("inlet"),
        json!({"kind": "inlet"}),
        json!([0, 0, 1]),
        json!([0, 0, 1, 0, 9]),
        json!([0, "x", 1, 0]),
        json!([-1, 0, 1, 0]),
        json!([null]),
        json!([true, 1]),
    ] {
        assert!(
            matches!(ControlCommand::decode(&value), Err(Error::MalformedControl(_))),
            "expected malformed control for {}",
            value
        );
    }
}

#[test]
fn control_batch_requires_list() {
    assert_eq!(control_batch(&json!([["inlet"]])).unwrap().len(), 1);
    assert!(matches!(
        control_batch(&json!({"add": "inlet"})),
        Err(Error::MalformedControl(_))
    ));
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_display() {
    let err = Error::InvalidReference { index: 5, count: 2 };
    assert_eq!(
        err.to_string(),
        "invalid reference: gadget 5 does not exist (2 gadgets)"
    );
    let err = Error::gadget_construction("blah", "unknown gadget kind");
    assert_eq!(
        err.to_string(),
        "gadget construction failed: blah - unknown gadget kind"
    );
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: Error = json_err.into();
    assert_eq!(err.kind(), "json");
}

#[test]
fn decode_create_rejects_names_that_are_not_one_level() {
    for name in ["", "#", "+", "a/b", "loop/#", "/"] {
        assert!(
            matches!(
                decode_create(&json!(["create", name])),
                Err(Error::MalformedControl(_))
            ),
            "expected {:?} to be refused",
            name
        );
    }
    assert!(validate_circuit_name("loop-2.b").is_ok());
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn default_config_bootstraps_loop() {
    let config = ServiceConfig::default();
    assert_eq!(config.prefix, "s/circuitry");
    assert_eq!(config.gateway.port, 18883);
    assert_eq!(config.gateway.bind, BindMode::Loopback);
    assert_eq!(config.circuits, vec![BootstrapCircuit::loopback()]);
    assert_eq!(config.topics().registry_topic(), "registry-s/circuitry");
}

#[test]
fn config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::load(&dir.path().join("absent.toml"));
    assert_eq!(config.prefix, "s/circuitry");
}

#[test]
fn config_load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("circuitry.toml");
    std::fs::write(
        &path,
        r#"
prefix = "s/pyf-demo"

[gateway]
port = 9000
bind = "lan"

[[circuits]]
name = "echo"
commands = [["inlet"], ["outlet"], [0, 0, 1, 0]]
"#,
    )
    .unwrap();

    let config = ServiceConfig::load(&path);
    assert_eq!(config.prefix, "s/pyf-demo");
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.bind, BindMode::Lan);
    assert_eq!(config.circuits.len(), 1);
    assert_eq!(config.circuits[0].name, "echo");
    assert_eq!(
        config.circuits[0].control_payload(),
        json!([["inlet"], ["outlet"], [0, 0, 1, 0]])
    );
}

#[test]
fn config_load_garbage_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "prefix = [").unwrap();
    let config = ServiceConfig::load(&path);
    assert_eq!(config.prefix, "s/circuitry");
}

#[test]
fn config_validate_rejects_unsubscribable_names() {
    assert!(ServiceConfig::default().validate().is_ok());

    for prefix in ["", "s/#", "s/+/x"] {
        let config = ServiceConfig {
            prefix: prefix.to_string(),
            ..Default::default()
        };
        assert!(
            matches!(config.validate(), Err(Error::ConfigError(_))),
            "prefix {:?}",
            prefix
        );
    }

    let mut config = ServiceConfig::default();
    config.circuits.push(BootstrapCircuit {
        name: "a/b".to_string(),
        commands: vec![],
    });
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind(), "config");
}

#[test]
fn bind_mode_addresses() {
    assert_eq!(BindMode::Loopback.to_addr(), "127.0.0.1");
    assert_eq!(BindMode::Lan.to_addr(), "0.0.0.0");
    assert_eq!(BindMode::parse("lan"), BindMode::Lan);
    assert_eq!(BindMode::parse("localhost"), BindMode::Loopback);
}

// ===========================================================================
// Gateway frames
// ===========================================================================

#[test]
fn client_frame_publish_parse() {
    let frame: ClientFrame = serde_json::from_str(
        r#"{"op":"publish","topic":"s/demo/loop/in/0","payload":"\"hello\""}"#,
    )
    .unwrap();
    assert_eq!(
        frame,
        ClientFrame::Publish {
            topic: "s/demo/loop/in/0".into(),
            payload: "\"hello\"".into(),
            retain: false,
        }
    );
}

#[test]
fn client_frame_subscribe_and_ping_parse() {
    let frame: ClientFrame =
        serde_json::from_str(r#"{"op":"subscribe","filters":["s/demo/+/out/#"]}"#).unwrap();
    assert_eq!(
        frame,
        ClientFrame::Subscribe {
            filters: vec!["s/demo/+/out/#".into()],
            qos: QoS::AtMostOnce,
        }
    );
    let frame: ClientFrame =
        serde_json::from_str(r#"{"op":"subscribe","filters":["a"],"qos":"at_least_once"}"#)
            .unwrap();
    assert!(matches!(
        frame,
        ClientFrame::Subscribe {
            qos: QoS::AtLeastOnce,
            ..
        }
    ));
    let frame: ClientFrame = serde_json::from_str(r#"{"op":"ping"}"#).unwrap();
    assert_eq!(frame, ClientFrame::Ping);
}

#[test]
fn client_frame_unknown_op_fails() {
    assert!(serde_json::from_str::<ClientFrame>(r#"{"op":"explode"}"#).is_err());
}

#[test]
fn event_message_delivery() {
    let evt = EventMessage::message("s/demo/loop/out/3", br#""\"hi\"""#);
    assert_eq!(evt.event, "message");
    assert_eq!(
        evt.as_delivery(),
        Some(("s/demo/loop/out/3", r#""\"hi\"""#))
    );
    assert_eq!(EventMessage::pong().as_delivery(), None);
    let json = serde_json::to_value(&EventMessage::error("boom")).unwrap();
    assert_eq!(json, json!({"event": "error", "data": {"message": "boom"}}));
}
