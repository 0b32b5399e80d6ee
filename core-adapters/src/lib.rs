//! # Host Capability Adapters
//!
//! Thin consumers of the bridge transport, one per host capability:
//!
//! - [`AudioRecorder`] - microphone levels and recording (`RecordService`)
//! - [`VideoProvider`] - camera frames (`CameraService`)
//! - [`LinkSocket`] - peer device messaging (`LinkService`)
//! - [`AssetStore`] / [`ProjectStore`] - project persistence
//!   (`AssetService`, `DocumentService`)
//!
//! Device adapters share the permission-gated [`StreamLifecycle`]: once an
//! adapter is disposed, a permission result still in flight changes nothing
//! and no observer callback fires again.
//!
//! Every adapter is built from a [`core_bridge::BridgeContext`]; none of
//! them hold global state.

pub mod audio;
pub mod error;
pub mod lifecycle;
pub mod link_socket;
pub mod storage;
pub mod video;

pub use audio::{AudioRecorder, RecorderObserver};
pub use error::{AdapterError, Result};
pub use lifecycle::{DisableStep, EnableStep, LifecycleState, PermissionStep, StreamLifecycle};
pub use link_socket::LinkSocket;
pub use storage::{Asset, AssetKey, AssetStore, ProjectStore};
pub use video::{Frame, VideoProvider};
