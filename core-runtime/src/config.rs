//! # Bridge Configuration Module
//!
//! Provides configuration management for the bridge core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `BridgeConfig` instance that holds the host channel and the rules the
//! network interception layer applies. It enforces fail-fast validation so
//! a shell that forgot to wire its channel finds out at startup, not on the
//! first call.
//!
//! ## Required Dependencies
//!
//! - `HostChannel` - the outbound half of the host message channel
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::rc::Rc;
//!
//! let config = BridgeConfig::builder()
//!     .channel(Rc::new(MyChannel::new()))
//!     .scheme("native")
//!     .binary_extension("sb3")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! A missing channel is reported as `Error::CapabilityMissing`; malformed
//! interception rules as `Error::Config`.

use crate::error::{Error, Result};
use bridge_traits::HostChannel;
use std::fmt;
use std::rc::Rc;

/// Scheme recognized by the interception layer when none is configured.
pub const DEFAULT_SCHEME: &str = "native";

/// Path extensions whose responses are base64-encoded binary by default.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &["zip"];

/// Configuration for the bridge core.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Outbound half of the host channel (required)
    pub channel: Rc<dyn HostChannel>,

    /// Rules for remapping networking calls onto the bridge
    pub interception: InterceptionConfig,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("channel", &"HostChannel { ... }")
            .field("interception", &self.interception)
            .finish()
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Rules applied by the network interception adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptionConfig {
    /// Reserved URL scheme, lowercase, without the trailing `:`
    pub scheme: String,

    /// Lowercase path extensions (no leading dot) answered as binary
    pub binary_extensions: Vec<String>,

    /// Rewrite host-reported status 0 into a successful response
    pub normalize_zero_status: bool,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            binary_extensions: DEFAULT_BINARY_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            normalize_zero_status: true,
        }
    }
}

impl InterceptionConfig {
    /// Whether `path` ends in one of the binary extensions.
    pub fn is_binary_path(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((_, ext)) => self
                .binary_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Check the rules and bring them into canonical form.
    pub fn validated(mut self) -> Result<Self> {
        self.scheme = normalize_scheme(&self.scheme)?;
        self.binary_extensions = self
            .binary_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect::<Result<Vec<_>>>()?;
        let mut seen = Vec::with_capacity(self.binary_extensions.len());
        self.binary_extensions.retain(|ext| {
            if seen.contains(ext) {
                return false;
            }
            seen.push(ext.clone());
            true
        });
        Ok(self)
    }
}

fn normalize_scheme(raw: &str) -> Result<String> {
    let scheme = raw.trim().trim_end_matches(':').to_ascii_lowercase();

    if scheme.is_empty() {
        return Err(Error::Config("Interception scheme must not be empty".to_string()));
    }

    let starts_with_letter = scheme.starts_with(|c: char| c.is_ascii_alphabetic());
    let valid_chars = scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if !starts_with_letter || !valid_chars {
        return Err(Error::Config(format!(
            "Invalid interception scheme '{}': expected a letter followed by [a-z0-9+.-]",
            raw
        )));
    }

    Ok(scheme)
}

fn normalize_extension(raw: &str) -> Result<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || ext.contains('/') {
        return Err(Error::Config(format!("Invalid binary extension '{}'", raw)));
    }
    Ok(ext)
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    channel: Option<Rc<dyn HostChannel>>,
    scheme: Option<String>,
    binary_extensions: Option<Vec<String>>,
    normalize_zero_status: Option<bool>,
}

impl BridgeConfigBuilder {
    /// Set the host channel (required).
    pub fn channel(mut self, channel: Rc<dyn HostChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the reserved scheme, with or without the trailing `:`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Add one binary extension on top of the defaults.
    pub fn binary_extension(mut self, extension: impl Into<String>) -> Self {
        self.binary_extensions
            .get_or_insert_with(|| InterceptionConfig::default().binary_extensions)
            .push(extension.into());
        self
    }

    /// Replace the binary extension list entirely.
    pub fn binary_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binary_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn normalize_zero_status(mut self, enabled: bool) -> Self {
        self.normalize_zero_status = Some(enabled);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` if no host channel was provided
    /// - `Config` if the scheme or an extension is malformed
    pub fn build(self) -> Result<BridgeConfig> {
        let channel = self.channel.ok_or_else(|| Error::CapabilityMissing {
            capability: "HostChannel".to_string(),
            message: "No host channel provided. \
                      WebAssembly shells: use bridge-wasm's JsHostChannel. \
                      Tests and native shells: use bridge-loopback."
                .to_string(),
        })?;

        let defaults = InterceptionConfig::default();
        let interception = InterceptionConfig {
            scheme: self.scheme.unwrap_or(defaults.scheme),
            binary_extensions: self.binary_extensions.unwrap_or(defaults.binary_extensions),
            normalize_zero_status: self
                .normalize_zero_status
                .unwrap_or(defaults.normalize_zero_status),
        }
        .validated()?;

        Ok(BridgeConfig {
            channel,
            interception,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{OutboundMessage, Result as BridgeResult};

    struct NoopChannel;

    impl HostChannel for NoopChannel {
        fn post(&self, _message: OutboundMessage) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn channel() -> Rc<dyn HostChannel> {
        Rc::new(NoopChannel)
    }

    #[test]
    fn test_missing_channel_fails_fast() {
        let result = BridgeConfig::builder().build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HostChannel")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::builder().channel(channel()).build().unwrap();
        assert_eq!(config.interception, InterceptionConfig::default());
        assert_eq!(config.interception.scheme, "native");
        assert!(config.interception.normalize_zero_status);
    }

    #[test]
    fn test_scheme_is_normalized() {
        let config = BridgeConfig::builder()
            .channel(channel())
            .scheme(" Native: ")
            .build()
            .unwrap();
        assert_eq!(config.interception.scheme, "native");
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        for bad in ["", ":", "1native", "na tive", "na/tive"] {
            let result = BridgeConfig::builder().channel(channel()).scheme(bad).build();
            assert!(matches!(result, Err(Error::Config(_))), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_binary_extensions() {
        let config = BridgeConfig::builder()
            .channel(channel())
            .binary_extension(".SB3")
            .build()
            .unwrap();
        assert_eq!(config.interception.binary_extensions, vec!["zip", "sb3"]);

        let rules = &config.interception;
        assert!(rules.is_binary_path("projects/demo.zip"));
        assert!(rules.is_binary_path("demo.Sb3"));
        assert!(!rules.is_binary_path("demo.json"));
        assert!(!rules.is_binary_path("zip"));
        assert!(!rules.is_binary_path("archive.zip/readme"));
    }

    #[test]
    fn test_empty_extension_rejected() {
        let result = BridgeConfig::builder()
            .channel(channel())
            .binary_extensions(["zip", "."])
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_hides_channel() {
        let config = BridgeConfig::builder().channel(channel()).build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HostChannel { ... }"));
        assert!(rendered.contains("native"));
    }
}
