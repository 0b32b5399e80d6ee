//! Host channel over a JavaScript `post` function.
//!
//! The embedding page hands over one function that forwards an envelope to
//! the native host (`window.webkit.messageHandlers.*.postMessage`, an Android
//! `JavascriptInterface`, ...). Envelopes cross as plain JS objects:
//!
//! ```javascript
//! { kind: "call", name: "AssetService@load", id: 3, payload: { ... } }
//! ```

use bridge_traits::{BridgeError, HostChannel, OutboundMessage, Result as BridgeResult};
use js_sys::Function as JsFunction;
use serde::Serialize;
use tracing::trace;
use wasm_bindgen::JsValue;

use crate::error::{js_message, WasmError};

/// [`HostChannel`] that calls a JS function for every outbound envelope.
pub struct JsHostChannel {
    post: JsFunction,
}

impl JsHostChannel {
    /// Wrap the page's `post(envelope)` function.
    pub fn new(post: JsFunction) -> Self {
        Self { post }
    }

    fn encode(message: &OutboundMessage) -> Result<JsValue, WasmError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(message.serialize(&serializer)?)
    }
}

impl HostChannel for JsHostChannel {
    fn post(&self, message: OutboundMessage) -> BridgeResult<()> {
        let value = Self::encode(&message).map_err(BridgeError::from)?;
        trace!(kind = ?message.kind, name = %message.name, "Posting to host");

        self.post
            .call1(&JsValue::NULL, &value)
            .map(|_| ())
            .map_err(|err| {
                BridgeError::transport(format!(
                    "host rejected {}: {}",
                    message.name,
                    js_message(&err)
                ))
            })
    }
}
