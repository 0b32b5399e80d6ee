//! Error types for the WebAssembly host bridge

use bridge_traits::BridgeError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Errors raised while talking to the JavaScript side
#[derive(Error, Debug)]
pub enum WasmError {
    /// JavaScript threw or rejected
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A value could not cross the JS boundary
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A browser API the bridge needs is missing
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::Serialization(message) => BridgeError::Decode(message),
            other => BridgeError::Transport(other.to_string()),
        }
    }
}

impl From<serde_wasm_bindgen::Error> for WasmError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        WasmError::Serialization(err.to_string())
    }
}

impl From<JsValue> for WasmError {
    fn from(js_value: JsValue) -> Self {
        WasmError::JavaScript(js_message(&js_value))
    }
}

/// Best-effort readable text for a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        text
    } else if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        error.message().into()
    } else {
        format!("{:?}", value)
    }
}

/// Convert any displayable error into a JS exception value.
pub(crate) fn to_js_error<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}
