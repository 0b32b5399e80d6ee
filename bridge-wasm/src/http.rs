//! WebAssembly implementation of the `HttpClient` bridge trait.
//!
//! This client forwards requests to the browser's `fetch` API and converts the
//! resulting `Response` objects back into the bridge-friendly `HttpResponse`
//! type. Wrapped in `core_intercept::InterceptingClient`, it carries every
//! request that does not target the reserved scheme.

use async_trait::async_trait;
use bridge_traits::{BridgeError, HttpClient, HttpRequest, HttpResponse, Result as BridgeResult};
use bytes::Bytes;
use js_sys::{try_iter, Array, Uint8Array};
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response, Window};

use crate::error::{js_message, WasmError};

/// WebAssembly HTTP client backed by the browser's `fetch` API.
#[derive(Clone)]
pub struct WasmFetchClient {
    window: Window,
}

impl WasmFetchClient {
    /// Create a new client bound to the current browser window.
    pub fn new() -> BridgeResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| WasmError::Unavailable("window".to_string()))?;
        Ok(Self { window })
    }

    fn build_request(&self, request: &HttpRequest) -> BridgeResult<Request> {
        let init = RequestInit::new();
        init.set_method(request.method.as_str());
        init.set_mode(RequestMode::Cors);

        if let Some(body) = &request.body {
            let body_array = Uint8Array::from(body.as_ref());
            init.set_body(&JsValue::from(body_array));
        }

        let headers = web_sys::Headers::new().map_err(|err| js_error("create headers", err))?;
        for (key, value) in &request.headers {
            headers
                .set(key, value)
                .map_err(|err| js_error("set header", err))?;
        }
        init.set_headers(&headers);

        Request::new_with_str_and_init(&request.url, &init)
            .map_err(|err| js_error("build request", err))
    }

    async fn read_body(response: &Response) -> BridgeResult<Bytes> {
        let promise = response
            .array_buffer()
            .map_err(|err| js_error("response.array_buffer", err))?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|err| js_error("response buffer", err))?;
        let array = Uint8Array::new(&buffer);
        let mut bytes = vec![0u8; array.length() as usize];
        array.copy_to(&mut bytes);
        Ok(Bytes::from(bytes))
    }

    fn collect_headers(response: &Response) -> BridgeResult<HashMap<String, String>> {
        let headers = response.headers();
        let iterator = try_iter(&JsValue::from(headers))
            .map_err(|err| js_error("iterate headers", err))?
            .ok_or_else(|| BridgeError::transport("Headers iterator unavailable"))?;

        let mut map = HashMap::new();
        for entry in iterator {
            let entry = entry.map_err(|err| js_error("header iteration", err))?;
            let pair = Array::from(&entry);
            if pair.length() >= 2 {
                if let (Some(key), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string())
                {
                    map.insert(key, value);
                }
            }
        }

        Ok(map)
    }
}

#[async_trait(?Send)]
impl HttpClient for WasmFetchClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let req = self.build_request(&request)?;
        let js_value = JsFuture::from(self.window.fetch_with_request(&req))
            .await
            .map_err(|err| js_error("fetch", err))?;
        let response = js_value
            .dyn_into::<Response>()
            .map_err(|_| BridgeError::transport("fetch returned non-Response"))?;

        let body = Self::read_body(&response).await?;
        let headers = Self::collect_headers(&response)?;

        Ok(HttpResponse {
            status: response.status(),
            headers,
            body,
        })
    }
}

fn js_error(context: &str, err: JsValue) -> BridgeError {
    BridgeError::transport(format!("WasmFetchClient {context}: {}", js_message(&err)))
}
