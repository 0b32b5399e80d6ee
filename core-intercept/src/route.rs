//! Address Resolution
//!
//! Decides whether an outgoing request targets the reserved scheme and, if
//! so, which host service it addresses. Two address shapes are accepted:
//!
//! | Address | Service | Path |
//! |---------|---------|------|
//! | `native://AssetService/foo.zip` | `AssetService` | `foo.zip` |
//! | `native:AssetService/foo.zip` | `AssetService` | `foo.zip` |
//! | `native:AssetService` | `AssetService` | (empty) |

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bridge_traits::{HttpMethod, HttpRequest, ServiceMethod};
use bytes::Bytes;
use core_runtime::InterceptionConfig;
use serde_json::{Map, Value};
use url::Url;

/// Outcome of inspecting one outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not for the bridge: unparseable address or another scheme.
    PassThrough,
    /// Reserved scheme with a usable service segment.
    Route(BridgeRoute),
    /// Reserved scheme but no service could be extracted.
    Malformed(String),
}

/// A request remapped onto a bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRoute {
    pub service: String,
    pub method: HttpMethod,
    /// Path below the service segment, still percent-encoded
    pub path: String,
    /// Query parameters; a repeated key keeps its last value
    pub params: BTreeMap<String, String>,
    /// Whether the response is base64 binary rather than text
    pub binary: bool,
}

impl BridgeRoute {
    /// `service@method`, method lowercased.
    pub fn service_method(&self) -> ServiceMethod {
        ServiceMethod::join(&self.service, &self.method.as_str().to_ascii_lowercase())
    }

    /// `{path, params, payload}`; `payload` is omitted when there is no body.
    pub fn call_payload(&self, body: Option<&Bytes>) -> Value {
        let params: Map<String, Value> = self
            .params
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let mut payload = Map::new();
        payload.insert("path".to_string(), Value::String(self.path.clone()));
        payload.insert("params".to_string(), Value::Object(params));
        if let Some(body) = body {
            payload.insert("payload".to_string(), encode_body(body));
        }
        Value::Object(payload)
    }
}

/// Inspect `request` against the interception rules.
pub fn resolve(rules: &InterceptionConfig, request: &HttpRequest) -> Resolution {
    let url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(_) => return Resolution::PassThrough,
    };

    if url.scheme() != rules.scheme {
        return Resolution::PassThrough;
    }

    let (service, path) = match url.host_str() {
        Some("") => {
            return Resolution::Malformed(format!("empty host in address '{}'", request.url))
        }
        Some(host) => (host.to_string(), url.path().trim_start_matches('/').to_string()),
        None => {
            let full = url.path().trim_start_matches('/');
            match full.split_once('/') {
                Some((service, path)) => (service.to_string(), path.to_string()),
                None => (full.to_string(), String::new()),
            }
        }
    };

    if service.is_empty() {
        return Resolution::Malformed(format!("no service in address '{}'", request.url));
    }

    let params = url.query_pairs().into_owned().collect();
    let binary = rules.is_binary_path(&path);

    Resolution::Route(BridgeRoute {
        service,
        method: request.method,
        path,
        params,
        binary,
    })
}

/// Request bodies cross the bridge as text: UTF-8 as-is, anything else as
/// base64.
fn encode_body(body: &Bytes) -> Value {
    match std::str::from_utf8(body) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(BASE64.encode(body)),
    }
}
