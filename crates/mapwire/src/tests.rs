//! Tests for instruction encoding, result decoding, and envelope parsing.

use serde_json::Value;
use serde_json::json;

use crate::envelope::Envelope;
use crate::instruction::CallInstruction;
use crate::instruction::decode_result;
use crate::resource::ResourceOp;

#[test]
fn test_instruction_roundtrip() {
    let args = vec![json!(5), json!("center"), json!({"lat": 47.6, "lon": -122.3})];
    let inst = CallInstruction::encode(7, Some("map_1"), "setZoom", &args).unwrap();

    assert_eq!(inst.call_id, 7);
    assert_eq!(inst.scope.as_deref(), Some("map_1"));
    assert_eq!(inst.command, "setZoom");
    assert_eq!(inst.decoded_args().unwrap(), args);
}

#[test]
fn test_instruction_wire_roundtrip() {
    let inst = CallInstruction::encode(3, None, "getZoom", &[]).unwrap();
    let wire = inst.to_wire().unwrap();
    let back = CallInstruction::from_wire(&wire).unwrap();

    assert_eq!(back.call_id, 3);
    assert!(back.scope.is_none());
    assert_eq!(back.decoded_args().unwrap(), Vec::<Value>::new());
}

#[test]
fn test_instruction_flattens_newlines() {
    let args = vec![json!("line one\nline two\r\nline three")];
    let inst = CallInstruction::encode(1, None, "setTitle", &args).unwrap();

    let decoded = inst.decoded_args().unwrap();
    assert_eq!(decoded, vec![json!("line one line two line three")]);
}

#[test]
fn test_instruction_payload_is_base64() {
    let inst = CallInstruction::encode(1, None, "cmd", &[json!("a&b\"c")]).unwrap();
    // The encoded payload must survive the instruction channel untouched:
    // no quotes, newlines, or ampersands.
    assert!(!inst.args.contains(['"', '\n', '&']));
}

#[test]
fn test_corrupt_payload_errors_are_classified() {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use crate::error::Error;

    let mut inst = CallInstruction::encode(1, None, "cmd", &[json!(1)]).unwrap();

    // Not base64 at all.
    inst.args = "not base64!!".to_owned();
    assert!(matches!(inst.decoded_args(), Err(Error::Encoding(_))));

    // Valid base64, but the bytes are not UTF-8.
    inst.args = BASE64.encode([0xFF, 0xFE, 0xFD]);
    assert!(matches!(inst.decoded_args(), Err(Error::Malformed(_))));

    // Valid UTF-8, but not JSON.
    inst.args = BASE64.encode("{broken");
    assert!(matches!(inst.decoded_args(), Err(Error::Serialization(_))));
}

#[test]
fn test_decode_result_typed() {
    assert_eq!(decode_result::<u32>(&json!(5)), Some(5));
    assert_eq!(decode_result::<bool>(&json!(true)), Some(true));
    assert_eq!(
        decode_result::<Vec<String>>(&json!(["a", "b"])),
        Some(vec!["a".to_owned(), "b".to_owned()])
    );
}

#[test]
fn test_decode_result_absence() {
    assert_eq!(decode_result::<u32>(&Value::Null), None);
    assert_eq!(decode_result::<u32>(&json!("")), None);
    assert_eq!(decode_result::<u32>(&json!({})), None);
}

#[test]
fn test_decode_result_malformed_is_absent() {
    // A string is not a u32; the decode must degrade, not panic.
    assert_eq!(decode_result::<u32>(&json!("not a number")), None);
}

#[test]
fn test_envelope_parse_routing_fields() {
    let raw = r#"{
        "type": "click",
        "mapId": "map_1",
        "markerId": "marker_4",
        "position": [47.6, -122.3],
        "pixel": [10, 20]
    }"#;

    let env = Envelope::parse(raw).unwrap();
    assert_eq!(env.kind, "click");
    assert_eq!(env.map_id.as_deref(), Some("map_1"));
    assert_eq!(env.target_id(), Some("marker_4"));
    assert!(env.task_id.is_none());
    assert_eq!(env.payload["position"], json!([47.6, -122.3]));
}

#[test]
fn test_envelope_completion_result() {
    let mut env = Envelope::completion(42, json!(true));
    assert_eq!(env.task_id, Some(42));
    assert_eq!(env.take_result(), json!(true));
    // A second take reads as absent.
    assert_eq!(env.take_result(), Value::Null);
}

#[test]
fn test_envelope_unknown_fields_are_payload() {
    let raw = r#"{"type": "animationProgress", "mapId": "m", "animationId": "anim_2", "progress": 0.5, "speed": 2}"#;
    let env = Envelope::parse(raw).unwrap();

    assert_eq!(env.target_id(), Some("anim_2"));
    assert_eq!(env.payload["progress"], json!(0.5));
    assert_eq!(env.payload["speed"], json!(2));
}

#[test]
fn test_resource_op_tags() {
    assert_eq!(ResourceOp::from_tag("embedded"), Some(ResourceOp::Embedded));
    assert_eq!(ResourceOp::from_tag("proxy"), Some(ResourceOp::Proxy));
    assert_eq!(ResourceOp::from_tag("tile"), Some(ResourceOp::Tile));
    assert_eq!(ResourceOp::from_tag("bogus"), None);
    assert_eq!(ResourceOp::Tile.as_tag(), "tile");
}
