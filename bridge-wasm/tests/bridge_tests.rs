//! Browser tests for the page-facing bridge.
//!
//! Run with `wasm-pack test --headless --chrome bridge-wasm`.

#![cfg(target_arch = "wasm32")]

use bridge_traits::{CorrelationId, HostChannel, OutboundMessage};
use bridge_wasm::{JsHostChannel, WasmBridge};
use js_sys::{Function, Reflect};
use serde_json::json;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn recorder(slot: &str) -> Function {
    Function::new_with_args("envelope", &format!("globalThis.{slot} = envelope;"))
}

fn recorded(slot: &str) -> JsValue {
    Reflect::get(&js_sys::global(), &JsValue::from_str(slot)).unwrap()
}

#[wasm_bindgen_test]
fn test_channel_posts_plain_objects() {
    let channel = JsHostChannel::new(recorder("callEnvelope"));

    channel
        .post(OutboundMessage::call(
            "AssetService@load".into(),
            CorrelationId::new(7),
            Some(json!({"assetId": "cat"})),
        ))
        .unwrap();

    let envelope = recorded("callEnvelope");
    let field = |name: &str| Reflect::get(&envelope, &JsValue::from_str(name)).unwrap();
    assert_eq!(field("kind").as_string().as_deref(), Some("call"));
    assert_eq!(field("name").as_string().as_deref(), Some("AssetService@load"));
    assert_eq!(field("id").as_f64(), Some(7.0));

    let payload = field("payload");
    let asset = Reflect::get(&payload, &JsValue::from_str("assetId")).unwrap();
    assert_eq!(asset.as_string().as_deref(), Some("cat"));
}

#[wasm_bindgen_test]
fn test_channel_run_omits_id() {
    let channel = JsHostChannel::new(recorder("runEnvelope"));

    channel
        .post(OutboundMessage::run("RecordService@start".into(), None))
        .unwrap();

    let envelope = recorded("runEnvelope");
    let id = Reflect::get(&envelope, &JsValue::from_str("id")).unwrap();
    assert!(id.is_undefined());
}

#[wasm_bindgen_test]
fn test_throwing_host_is_a_transport_failure() {
    let channel = JsHostChannel::new(Function::new_no_args("throw new Error('host gone');"));

    let err = channel
        .post(OutboundMessage::run("DocumentService@close".into(), None))
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("host gone"));
}

#[wasm_bindgen_test]
fn test_bridge_readiness() {
    let bridge = WasmBridge::new(recorder("readyEnvelope"), None, None).unwrap();
    assert!(!bridge.is_ready());

    bridge.signal_ready();
    assert!(bridge.is_ready());
}

#[wasm_bindgen_test]
fn test_bridge_rejects_bad_configuration() {
    let result = WasmBridge::new(recorder("badEnvelope"), Some("1nvalid".to_string()), None);
    assert!(result.is_err());
}

#[wasm_bindgen_test]
fn test_deliver_rejects_malformed_envelopes() {
    let bridge = WasmBridge::new(recorder("deliverEnvelope"), None, None).unwrap();

    assert!(bridge.deliver(JsValue::from_str("not an envelope")).is_err());

    let unknown = serde_wasm_bindgen::to_value(&json!({"id": 99, "payload": "late"})).unwrap();
    assert!(bridge.deliver(unknown).is_ok());
}
