//! Response synthesis and post-processing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bridge_traits::{BridgeError, HttpResponse, Result};
use bytes::Bytes;
use serde_json::Value;

use crate::route::BridgeRoute;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Build the response for a bridge call that succeeded.
///
/// # Errors
///
/// `BridgeError::Decode` when a binary route receives anything but valid
/// base64 text.
pub fn bridged_response(route: &BridgeRoute, payload: Value) -> Result<HttpResponse> {
    let (body, content_type) = if route.binary {
        let encoded = match payload {
            Value::String(text) => text,
            other => {
                return Err(BridgeError::decode(format!(
                    "expected base64 text for {}, got {}",
                    route.path,
                    kind_of(&other)
                )))
            }
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| BridgeError::decode(format!("invalid base64 for {}: {}", route.path, e)))?;
        (Bytes::from(bytes), OCTET_STREAM)
    } else {
        let text = match payload {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        (Bytes::from(text), TEXT_PLAIN)
    };

    Ok(HttpResponse::new(200, body).with_header(bridge_traits::http::CONTENT_TYPE, content_type))
}

/// Response handed back when the bridge call itself failed.
///
/// | Error | Status |
/// |-------|--------|
/// | `Transport` | 503 |
/// | `Host`, `Decode` | 502 |
/// | `PermissionDenied` | 403 |
pub fn failure_response(err: &BridgeError) -> HttpResponse {
    let status = match err {
        BridgeError::Transport(_) => 503,
        BridgeError::Host { .. } | BridgeError::Decode(_) => 502,
        BridgeError::PermissionDenied(_) => 403,
    };
    HttpResponse::new(status, err.to_string())
        .with_header(bridge_traits::http::CONTENT_TYPE, TEXT_PLAIN)
}

/// Rewrite a misreported status 0 into 200, keeping headers and body.
pub fn normalize_status(mut response: HttpResponse) -> HttpResponse {
    if response.status == 0 {
        response.status = 200;
    }
    response
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::HttpMethod;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn route(binary: bool) -> BridgeRoute {
        BridgeRoute {
            service: "AssetService".to_string(),
            method: HttpMethod::Get,
            path: if binary { "a.zip" } else { "a.json" }.to_string(),
            params: BTreeMap::new(),
            binary,
        }
    }

    #[test]
    fn test_binary_payload_is_decoded() {
        let response = bridged_response(&route(true), json!("UEsDBA==")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"PK\x03\x04");
        assert_eq!(response.content_type(), Some(OCTET_STREAM));
    }

    #[test]
    fn test_bad_binary_payload() {
        assert!(matches!(
            bridged_response(&route(true), json!("%%%")),
            Err(BridgeError::Decode(_))
        ));
        assert!(matches!(
            bridged_response(&route(true), Value::Null),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn test_text_payloads() {
        let text = bridged_response(&route(false), json!("{\"x\":1}")).unwrap();
        assert_eq!(text.text().unwrap(), "{\"x\":1}");
        assert_eq!(text.content_type(), Some(TEXT_PLAIN));

        let empty = bridged_response(&route(false), Value::Null).unwrap();
        assert!(empty.body.is_empty());

        let structured = bridged_response(&route(false), json!({"x": 1})).unwrap();
        assert_eq!(structured.json::<Value>().unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_failure_statuses() {
        assert_eq!(failure_response(&BridgeError::transport("gone")).status, 503);
        let host = failure_response(&BridgeError::Host {
            code: 3,
            message: "boom".to_string(),
        });
        assert_eq!(host.status, 502);
        assert_eq!(host.text().unwrap(), "Host error 3: boom");
        assert_eq!(failure_response(&BridgeError::decode("bad")).status, 502);
    }

    #[test]
    fn test_zero_status_normalized() {
        let fixed = normalize_status(HttpResponse::new(0, "body").with_header("X-A", "1"));
        assert_eq!(fixed.status, 200);
        assert_eq!(&fixed.body[..], b"body");
        assert_eq!(fixed.headers.get("X-A").map(String::as_str), Some("1"));

        assert_eq!(normalize_status(HttpResponse::new(404, "")).status, 404);
    }
}
