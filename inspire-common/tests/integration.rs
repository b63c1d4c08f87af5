//! Integration tests for inspire-common.

use std::collections::BTreeMap;
use inspire_common::{
    CommandError, CommandTarget, ControlCommand, Format, HandSide, HandState, HandTopics,
    HandTouch, TouchMatrix, WireCommand, decode, decode_auto, encode,
};

#[test]
fn test_state_workflow() {
    let state = HandState {
        timestamp: 1_700_000_000_123,
        pos_act: Some(vec![0, 10, 20, 30, 40, 50]),
        angle_act: Some(vec![1000, 1000, 1000, 1000, 990, -1]),
        force_act: None,
        current: Some(vec![12, 10, 11, 9, 15, 8]),
        err: Some(vec![0; 6]),
        status: Some(vec![2; 6]),
        temperature: Some(vec![35; 6]),
    };

    let json_bytes = encode(&state, Format::Json).expect("JSON encode failed");
    let json: serde_json::Value = serde_json::from_slice(&json_bytes).unwrap();
    assert!(json.get("force_act").is_none(), "missing channel must be omitted");

    let decoded: HandState = decode(&json_bytes, Format::Json).expect("JSON decode failed");
    assert_eq!(decoded, state);

    let cbor_bytes = encode(&state, Format::Cbor).expect("CBOR encode failed");
    let auto_decoded: HandState = decode_auto(&cbor_bytes).expect("Auto decode failed");
    assert_eq!(auto_decoded, state);
}

#[test]
fn test_touch_frame_cbor_is_smaller() {
    let mut regions = BTreeMap::new();
    regions.insert(
        "palm_touch".to_string(),
        TouchMatrix::from_flat(14, 8, (0..112).collect()).unwrap(),
    );
    let touch = HandTouch {
        timestamp: 1,
        regions,
    };

    let json = encode(&touch, Format::Json).unwrap();
    let cbor = encode(&touch, Format::Cbor).unwrap();
    assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");

    let decoded: HandTouch = decode_auto(&cbor).unwrap();
    assert_eq!(decoded.regions["palm_touch"].get(13, 7), Some(111));
}

#[test]
fn test_topics_for_both_sides() {
    let left = HandTopics::new(HandSide::Left);
    let right = HandTopics::new("right".parse().unwrap());

    assert_eq!(left.state(), "rt/inspire_hand/state/l");
    assert_eq!(left.touch(), "rt/inspire_hand/touch/l");
    assert_eq!(right.ctrl(), "rt/inspire_hand/ctrl/r");
    assert_eq!(right.status(), "rt/inspire_hand/@/status/r");
}

#[test]
fn test_command_wire_workflow() {
    let command = ControlCommand::builder()
        .position(&[100; 6])
        .unwrap()
        .force(&[500; 6])
        .unwrap()
        .build();

    let bytes = encode(&command, Format::Json).unwrap();
    let wire: WireCommand = decode(&bytes, Format::Json).unwrap();
    assert_eq!(wire.mode, 0b0110);
    assert!(wire.angle_set.is_none());

    let decoded: ControlCommand = decode_auto(&encode(&command, Format::Cbor).unwrap()).unwrap();
    assert_eq!(decoded, command);
    let targets: Vec<_> = decoded.selected().map(|(target, _)| target).collect();
    assert_eq!(targets, vec![CommandTarget::Position, CommandTarget::Force]);
}

#[test]
fn test_command_from_foreign_publisher() {
    // Mode bits above bit 3 carry no meaning and are dropped.
    let command: ControlCommand =
        serde_json::from_str(r#"{"mode": 17, "angle_set": [1, 2, 3, 4, 5, 6]}"#).unwrap();
    assert_eq!(command.mode().bits(), 1);

    let err = serde_json::from_str::<ControlCommand>(r#"{"mode": 8}"#).unwrap_err();
    assert!(err.to_string().contains("speed"), "{}", err);
}

#[test]
fn test_builder_errors_convert() {
    let err = ControlCommand::builder().speed(&[1; 7]).unwrap_err();
    assert!(matches!(
        err,
        CommandError::InvalidArity {
            target: CommandTarget::Speed,
            expected: 6,
            actual: 7
        }
    ));

    let err: inspire_common::Error = err.into();
    assert!(err.to_string().contains("Invalid command"));
}
