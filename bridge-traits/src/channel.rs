//! Host Channel Contract
//!
//! The host shell provides one opaque, bidirectional message channel. The
//! client side only needs to post [`OutboundMessage`]s; inbound traffic is
//! pushed back through an [`InboundSink`] the channel was attached to.
//!
//! Everything runs on a single event loop, so neither trait requires
//! `Send`/`Sync`.

use std::rc::Weak;

use crate::error::Result;
use crate::message::{InboundMessage, OutboundMessage};

/// Outbound half of the host channel.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::channel::HostChannel;
/// use bridge_traits::message::OutboundMessage;
///
/// struct ConsoleChannel;
///
/// impl HostChannel for ConsoleChannel {
///     fn post(&self, message: OutboundMessage) -> Result<()> {
///         println!("{}", serde_json::to_string(&message)?);
///         Ok(())
///     }
/// }
/// ```
pub trait HostChannel {
    /// Transmit an envelope to the host.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`](crate::BridgeError::Transport) when
    /// the host side is gone or refused the envelope.
    fn post(&self, message: OutboundMessage) -> Result<()>;

    /// Register the receiver for inbound traffic.
    ///
    /// Channels whose host pushes messages by other means may ignore this.
    fn attach(&self, sink: Weak<dyn InboundSink>) {
        let _ = sink;
    }
}

/// Inbound half: where the host delivers responses, pushes and readiness.
pub trait InboundSink {
    /// Route a response or stream push to whoever is waiting for it.
    fn deliver(&self, message: InboundMessage);

    /// The host finished initializing its side of the bridge.
    fn signal_ready(&self);
}
