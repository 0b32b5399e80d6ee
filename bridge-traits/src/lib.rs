//! # Host Bridge Traits
//!
//! The contract between the client-side core and the native host shell it is
//! embedded in.
//!
//! ## Overview
//!
//! The host exposes every capability (camera, microphone, storage, peer link)
//! through one narrow channel: the client posts `Service@method` envelopes and
//! the host answers with correlated responses or stream pushes. This crate
//! defines that channel and the vocabulary around it; it contains no
//! transport logic of its own.
//!
//! ## Modules
//!
//! - [`message`] - Wire envelopes, [`ServiceMethod`], [`CorrelationId`]
//! - [`channel`] - [`HostChannel`] (outbound) and [`InboundSink`] (inbound)
//! - [`http`] - Request/response model and [`HttpClient`] for interception
//! - [`logging`] - [`LoggerSink`] for forwarding logs to the host
//! - [`error`] - The [`BridgeError`] taxonomy
//!
//! ## Threading
//!
//! The bridge lives on the webview's single event loop. Channel traits are
//! therefore not `Send`; shared state uses `Rc`/`RefCell` rather than locks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::{HostChannel, OutboundMessage, Result};
//!
//! struct PostMessageChannel { /* handle to the host */ }
//!
//! impl HostChannel for PostMessageChannel {
//!     fn post(&self, message: OutboundMessage) -> Result<()> {
//!         // hand the envelope to the host
//!         todo!()
//!     }
//! }
//! ```

pub mod channel;
pub mod error;
pub mod http;
pub mod logging;
pub mod message;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use channel::{HostChannel, InboundSink};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use message::{
    CorrelationId, HostFailure, InboundMessage, OutboundKind, OutboundMessage, ServiceMethod,
};
