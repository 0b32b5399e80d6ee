//! Workspace facade crate.
//!
//! Re-exports the bridge crates under one name so a host shell can depend on
//! `shellbridge` and pick the pieces it needs through features:
//!
//! - `adapters` (default): permission-gated device and storage adapters
//! - `wasm`: the `wasm-bindgen` entry point for webview builds

pub use bridge_traits as traits;
pub use core_bridge as bridge;
pub use core_intercept as intercept;
pub use core_runtime as runtime;

#[cfg(feature = "adapters")]
pub use core_adapters as adapters;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use bridge_wasm as wasm;
