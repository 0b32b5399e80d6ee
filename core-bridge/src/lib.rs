//! # Bridge Transport Core
//!
//! Client side of the host bridge: the one place that correlates requests
//! with responses and multiplexes push-stream subscriptions over the host's
//! single message channel.
//!
//! ## Primitives
//!
//! | Operation | Suspends | Registers |
//! |-----------|----------|-----------|
//! | [`BridgeTransport::call`] / [`BridgeTransport::call_json`] | yes | pending call |
//! | [`BridgeTransport::run`] | no | nothing |
//! | [`BridgeTransport::live`] / [`BridgeTransport::live_stream`] | no | subscription |
//! | [`BridgeTransport::die`] | no | removes subscription |
//!
//! plus the [`ReadinessGate`] that defers work until the host is initialized.
//!
//! ## Ownership
//!
//! [`BridgeContext`] bundles the transport and the gate and is handed to every
//! adapter at construction. There is no global bridge object.
//!
//! ## Ordering
//!
//! Call responses settle in whatever order the host completes them; only the
//! correlation ID decides which caller receives which payload. Pushes for one
//! subscription reach its handler in host-send order. Anything addressed to an
//! unknown, settled or cancelled correlation is dropped on arrival.

pub mod context;
pub mod readiness;
pub mod registry;
pub mod stream;
pub mod transport;

pub use context::BridgeContext;
pub use readiness::ReadinessGate;
pub use registry::{CorrelationRegistry, Route};
pub use stream::LiveStream;
pub use transport::{decode_json, BridgeTransport, EventHandler, PendingCall};

pub use bridge_traits::{BridgeError, CorrelationId, Result, ServiceMethod};
