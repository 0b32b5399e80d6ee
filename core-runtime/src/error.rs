//! Errors raised while assembling the bridge runtime.

use thiserror::Error;

/// Startup failures. None of these happen once the bridge is running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Interception rules or other settings are malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host capability was not wired in.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The tracing subscriber could not be installed or the filter is invalid.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_display() {
        let err = Error::CapabilityMissing {
            capability: "HostChannel".to_string(),
            message: "wire one in".to_string(),
        };
        assert_eq!(err.to_string(), "Capability missing: HostChannel - wire one in");
    }
}
