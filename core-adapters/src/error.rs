use bridge_traits::BridgeError;
use thiserror::Error;

/// Failures reported by the device and storage adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Open, close, message and error handlers must be set before opening the socket")]
    SocketHandlersMissing,

    #[error("Asset not found: {asset_id}")]
    AssetNotFound { asset_id: String },

    #[error("Host returned no recording")]
    NoRecording,
}

impl AdapterError {
    pub fn permission_denied(capability: &str) -> Self {
        Self::Bridge(BridgeError::PermissionDenied(capability.to_string()))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Bridge(BridgeError::PermissionDenied(_)))
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
