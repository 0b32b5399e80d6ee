//! Entry point exported to the embedding page.
//!
//! The page constructs one [`WasmBridge`] with the function that posts to the
//! native host, then routes host traffic back in through
//! [`WasmBridge::deliver`] and [`WasmBridge::signal_ready`]. Web networking
//! calls go through [`WasmBridge::fetch`] so reserved-scheme URLs reach the
//! host while everything else reaches the network.

use std::rc::Rc;

use bridge_traits::{HttpClient, HttpMethod, HttpRequest, InboundMessage};
use bytes::Bytes;
use core_bridge::BridgeContext;
use core_intercept::{InterceptingClient, NetworkInterceptor};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::BridgeConfig;
use js_sys::{Function as JsFunction, Object, Promise, Reflect, Uint8Array};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::channel::JsHostChannel;
use crate::error::{to_js_error, WasmError};
use crate::http::WasmFetchClient;

/// Bridge handle owned by the page.
#[wasm_bindgen]
pub struct WasmBridge {
    context: BridgeContext,
    client: Rc<InterceptingClient<WasmFetchClient>>,
}

#[wasm_bindgen]
impl WasmBridge {
    /// Wire the bridge to a host `post` function.
    ///
    /// `scheme` overrides the reserved URL scheme and `binary_extensions`
    /// adds to the extensions answered as binary.
    #[wasm_bindgen(constructor)]
    pub fn new(
        post: JsFunction,
        scheme: Option<String>,
        binary_extensions: Option<Vec<String>>,
    ) -> Result<WasmBridge, JsValue> {
        console_error_panic_hook::set_once();
        if let Err(err) = init_logging(LoggingConfig::default()) {
            debug!(error = %err, "Logging already initialized");
        }

        let mut builder = BridgeConfig::builder().channel(Rc::new(JsHostChannel::new(post)));
        if let Some(scheme) = scheme {
            builder = builder.scheme(scheme);
        }
        for extension in binary_extensions.unwrap_or_default() {
            builder = builder.binary_extension(extension);
        }
        let config = builder.build().map_err(to_js_error)?;

        let context = BridgeContext::new(config);
        let fetch = WasmFetchClient::new().map_err(to_js_error)?;
        let client = Rc::new(InterceptingClient::new(
            fetch,
            NetworkInterceptor::new(&context),
        ));

        Ok(Self { context, client })
    }

    /// Hand a host envelope (`{id, payload?, error?}`) to the bridge.
    pub fn deliver(&self, message: JsValue) -> Result<(), JsValue> {
        let message: InboundMessage = serde_wasm_bindgen::from_value(message)
            .map_err(|err| to_js_error(WasmError::from(err)))?;
        self.context.deliver(message);
        Ok(())
    }

    /// The host finished initializing its side.
    #[wasm_bindgen(js_name = signalReady)]
    pub fn signal_ready(&self) {
        self.context.signal_ready();
    }

    /// Whether the host has signalled readiness.
    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.context.readiness().is_ready()
    }

    /// Run `callback` once the host is ready, immediately if it already is.
    #[wasm_bindgen(js_name = onReady)]
    pub fn on_ready(&self, callback: JsFunction) {
        self.context.on_ready(move || {
            if let Err(err) = callback.call0(&JsValue::NULL) {
                warn!(error = ?err, "Ready callback threw");
            }
        });
    }

    /// Reject everything in flight and cancel every subscription.
    pub fn shutdown(&self) {
        self.context.shutdown();
    }

    /// Perform a networking call, resolving to `{status, headers, body}`.
    pub fn fetch(&self, method: String, url: String, body: Option<Vec<u8>>) -> Promise {
        let client = Rc::clone(&self.client);

        future_to_promise(async move {
            let method: HttpMethod = method.parse().map_err(to_js_error)?;
            let mut request = HttpRequest::new(method, url);
            if let Some(body) = body {
                request = request.body(Bytes::from(body));
            }

            let response = client.execute(request).await.map_err(to_js_error)?;

            let result = Object::new();
            Reflect::set(&result, &"status".into(), &JsValue::from(response.status))?;
            let headers = serde_wasm_bindgen::to_value(&response.headers)
                .map_err(|err| to_js_error(WasmError::from(err)))?;
            Reflect::set(&result, &"headers".into(), &headers)?;
            Reflect::set(
                &result,
                &"body".into(),
                &Uint8Array::from(response.body.as_ref()).into(),
            )?;
            Ok(result.into())
        })
    }
}
