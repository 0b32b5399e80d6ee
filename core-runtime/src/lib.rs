//! # Core Runtime Module
//!
//! Provides the ambient infrastructure every bridge crate shares:
//! - Configuration management (`BridgeConfig` and its builder)
//! - Logging and tracing setup, including forwarding to the host logger
//!
//! ## Overview
//!
//! Nothing here talks to the host. The transport and the interception layer
//! read their settings from [`config::BridgeConfig`], and host shells call
//! [`logging::init_logging`] once during startup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{BridgeConfig, BridgeConfigBuilder, InterceptionConfig};
pub use error::{Error, Result};
