//! Envelopes exchanged with the host.
//!
//! The transport only ever forwards a [`ServiceMethod`] name, a
//! [`CorrelationId`] and an opaque JSON payload. How the host encodes these on
//! its side of the channel is its own business.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::BridgeError;

/// Host capability endpoint of the form `Service@method`.
///
/// Opaque to the transport: it is forwarded verbatim and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceMethod(String);

impl ServiceMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Join a service and a method with `@`.
    pub fn join(service: &str, method: &str) -> Self {
        Self(format!("{service}@{method}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceMethod {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceMethod {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identifier pairing a request with its response, or a subscription with its
/// pushed events. Calls and subscriptions draw from one counter, so the two
/// can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the host is asked to do with an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    /// Await-one-response call.
    Call,
    /// Fire-and-forget call.
    Run,
    /// Open a push-stream subscription.
    Subscribe,
    /// Cancel a push-stream subscription.
    Unsubscribe,
}

/// Envelope sent from the client to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: OutboundKind,
    pub name: ServiceMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl OutboundMessage {
    pub fn call(name: ServiceMethod, id: CorrelationId, payload: Option<Value>) -> Self {
        Self {
            kind: OutboundKind::Call,
            name,
            id: Some(id),
            payload,
        }
    }

    pub fn run(name: ServiceMethod, payload: Option<Value>) -> Self {
        Self {
            kind: OutboundKind::Run,
            name,
            id: None,
            payload,
        }
    }

    pub fn subscribe(name: ServiceMethod, id: CorrelationId) -> Self {
        Self {
            kind: OutboundKind::Subscribe,
            name,
            id: Some(id),
            payload: None,
        }
    }

    pub fn unsubscribe(name: ServiceMethod, id: CorrelationId) -> Self {
        Self {
            kind: OutboundKind::Unsubscribe,
            name,
            id: Some(id),
            payload: None,
        }
    }
}

/// Application-level failure reported by the host for a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl From<HostFailure> for BridgeError {
    fn from(failure: HostFailure) -> Self {
        BridgeError::Host {
            code: failure.code,
            message: failure.message,
        }
    }
}

/// Envelope delivered by the host: a call response or a stream push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: CorrelationId,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HostFailure>,
}

impl InboundMessage {
    pub fn ok(id: CorrelationId, payload: Value) -> Self {
        Self {
            id,
            payload,
            error: None,
        }
    }

    pub fn failed(id: CorrelationId, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            payload: Value::Null,
            error: Some(HostFailure {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Convert into the settlement of an await-one-response call.
    pub fn into_result(self) -> crate::error::Result<Value> {
        match self.error {
            Some(failure) => Err(failure.into()),
            None => Ok(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_method_join() {
        let name = ServiceMethod::join("AssetService", "get");
        assert_eq!(name.as_str(), "AssetService@get");
        assert_eq!(name.to_string(), "AssetService@get");
    }

    #[test]
    fn test_run_envelope_has_no_id() {
        let msg = OutboundMessage::run("RecordService@start".into(), None);
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded, json!({"kind": "run", "name": "RecordService@start"}));
    }

    #[test]
    fn test_call_envelope_shape() {
        let msg = OutboundMessage::call(
            "AssetService@load".into(),
            CorrelationId::new(7),
            Some(json!({"assetId": "abc"})),
        );
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            encoded,
            json!({
                "kind": "call",
                "name": "AssetService@load",
                "id": 7,
                "payload": {"assetId": "abc"}
            })
        );
    }

    #[test]
    fn test_inbound_error_into_result() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "id": 3,
            "error": {"code": 13, "message": "camera busy"}
        }))
        .unwrap();
        assert!(msg.is_error());
        assert_eq!(
            msg.into_result(),
            Err(BridgeError::Host {
                code: 13,
                message: "camera busy".to_string()
            })
        );
    }

    #[test]
    fn test_inbound_payload_defaults_to_null() {
        let msg: InboundMessage = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(msg.into_result(), Ok(Value::Null));
    }
}
