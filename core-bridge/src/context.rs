//! Bridge Context
//!
//! The explicit object adapters receive at construction: one transport, one
//! readiness gate and the interception rules, all built from a single
//! [`BridgeConfig`].

use std::rc::Rc;

use bridge_traits::{InboundMessage, InboundSink};
use core_runtime::{BridgeConfig, InterceptionConfig};
use tracing::info;

use crate::readiness::ReadinessGate;
use crate::transport::BridgeTransport;

/// Receives inbound host traffic on behalf of a [`BridgeContext`].
struct HostLink {
    transport: BridgeTransport,
    readiness: ReadinessGate,
}

impl InboundSink for HostLink {
    fn deliver(&self, message: InboundMessage) {
        self.transport.dispatch(message);
    }

    fn signal_ready(&self) {
        self.readiness.mark_ready();
    }
}

/// Owns the client side of the bridge for one page/session.
///
/// Dropping the context shuts the transport down: pending calls fail with
/// `BridgeError::Transport` and open subscriptions are cancelled.
pub struct BridgeContext {
    transport: BridgeTransport,
    readiness: ReadinessGate,
    interception: InterceptionConfig,
    link: Rc<HostLink>,
}

impl BridgeContext {
    /// Build the transport and attach it to `config.channel` for inbound
    /// traffic.
    pub fn new(config: BridgeConfig) -> Self {
        let transport = BridgeTransport::new(Rc::clone(&config.channel));
        let readiness = ReadinessGate::new();

        let link = Rc::new(HostLink {
            transport: transport.clone(),
            readiness: readiness.clone(),
        });
        let sink: Rc<dyn InboundSink> = link.clone();
        config.channel.attach(Rc::downgrade(&sink));

        info!(scheme = %config.interception.scheme, "Bridge context created");

        Self {
            transport,
            readiness,
            interception: config.interception,
            link,
        }
    }

    pub fn transport(&self) -> &BridgeTransport {
        &self.transport
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub fn interception(&self) -> &InterceptionConfig {
        &self.interception
    }

    /// Shorthand for `readiness().on_ready(callback)`.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        self.readiness.on_ready(callback);
    }

    /// Entry point for hosts that push inbound traffic directly rather than
    /// through [`HostChannel::attach`](bridge_traits::HostChannel::attach).
    pub fn deliver(&self, message: InboundMessage) {
        self.link.deliver(message);
    }

    /// See [`deliver`](Self::deliver).
    pub fn signal_ready(&self) {
        self.link.signal_ready();
    }

    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl Drop for BridgeContext {
    fn drop(&mut self) {
        self.transport.shutdown();
    }
}
