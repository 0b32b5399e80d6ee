//! WebAssembly Host Bridge
//!
//! Runs the bridge core inside a webview and connects it to the page.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets; native shells and tests use
//! `bridge-loopback` instead.
//!
//! # Implementations
//!
//! - [`JsHostChannel`]: `HostChannel` over a page-supplied JS `post` function
//! - [`WasmFetchClient`]: `HttpClient` over the browser `fetch` API
//! - [`WasmBridge`]: the `#[wasm_bindgen]` handle the page drives
//!
//! # Examples
//!
//! ```javascript
//! const bridge = new WasmBridge((envelope) => host.postMessage(envelope), "native", ["sb3"]);
//! host.onMessage = (message) => bridge.deliver(message);
//! host.onReady = () => bridge.signalReady();
//!
//! const { status, body } = await bridge.fetch("GET", "native:AssetService/cat.png");
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod channel;
pub mod error;
pub mod http;

// Re-export commonly used types
pub use bootstrap::WasmBridge;
pub use channel::JsHostChannel;
pub use error::WasmError;
pub use http::WasmFetchClient;
