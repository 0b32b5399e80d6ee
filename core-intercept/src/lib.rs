//! # Network Interception
//!
//! Remaps outgoing web networking calls whose address uses the reserved
//! scheme (default `native:`) onto bridge calls.
//!
//! ## Translation
//!
//! `GET native://AssetService/foo.zip?x=1` becomes
//! `call("AssetService@get", {path: "foo.zip", params: {x: "1"}})`. The
//! answer is returned as a 200 response: base64-decoded bytes when the path
//! ends in a binary extension, text otherwise.
//!
//! A failed bridge call still produces a response (503 when the host channel
//! is unavailable, 502 when the host or decoding failed), so callers are never
//! left waiting. Responses reporting status 0 are rewritten to 200.
//!
//! ## Usage
//!
//! ```ignore
//! use core_intercept::{InterceptingClient, NetworkInterceptor};
//!
//! let client = InterceptingClient::new(fetch_client, NetworkInterceptor::new(&context));
//! let response = client.execute(HttpRequest::get("native://AssetService/a.zip")).await?;
//! ```

pub mod interceptor;
pub mod normalize;
pub mod route;

pub use interceptor::{InterceptingClient, Interception, NetworkInterceptor};
pub use normalize::{bridged_response, failure_response, normalize_status};
pub use route::{resolve, BridgeRoute, Resolution};
