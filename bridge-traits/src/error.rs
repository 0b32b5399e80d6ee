use thiserror::Error;

/// Failures surfaced by the bridge and the adapters layered on it.
///
/// The transport never retries; every variant is reported to the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The host channel is unavailable or rejected the outbound envelope.
    #[error("Bridge transport error: {0}")]
    Transport(String),

    /// The host executed the call and reported an application-level failure.
    #[error("Host error {code}: {message}")]
    Host { code: i32, message: String },

    /// A response could not be decoded as structured data or binary.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A permission-gated capability was refused by the host.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl BridgeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Whether the failure originated before the host saw the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = BridgeError::Host {
            code: 404,
            message: "no such asset".to_string(),
        };
        assert_eq!(err.to_string(), "Host error 404: no such asset");
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err: BridgeError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, BridgeError::Decode(_)));
        assert!(!err.is_transport());
    }
}
