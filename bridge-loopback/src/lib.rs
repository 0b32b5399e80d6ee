//! # Loopback Host Channel
//!
//! An in-process stand-in for the native host shell.
//!
//! ## Overview
//!
//! [`LoopbackChannel`] implements [`HostChannel`] without any real host
//! behind it:
//! - every posted envelope is recorded in an outbox
//! - calls to a scripted `Service@method` are answered synchronously, from
//!   inside `post`, the way an eager host may
//! - everything else is answered by hand with [`respond`](LoopbackChannel::respond),
//!   [`push`](LoopbackChannel::push) and [`fail`](LoopbackChannel::fail),
//!   in whatever order the test wants
//! - [`disconnect`](LoopbackChannel::disconnect) makes `post` fail the way a
//!   missing host does
//!
//! Native shells use it for headless runs; the workspace's tests use it
//! everywhere a host is needed.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_loopback::LoopbackChannel;
//! use serde_json::json;
//!
//! let channel = LoopbackChannel::new();
//! channel.answer("AssetService@exists", |_| Ok(json!("true")));
//! // hand `channel` to BridgeConfig::builder().channel(...)
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use bridge_traits::{
    BridgeError, CorrelationId, HostChannel, HostFailure, InboundMessage, InboundSink,
    OutboundKind, OutboundMessage, Result, ServiceMethod,
};
use serde_json::Value;
use tracing::{debug, trace};

type Script = Rc<dyn Fn(Option<&Value>) -> std::result::Result<Value, HostFailure>>;

/// Scriptable in-memory host.
pub struct LoopbackChannel {
    sink: RefCell<Option<Weak<dyn InboundSink>>>,
    outbox: RefCell<Vec<OutboundMessage>>,
    scripts: RefCell<HashMap<ServiceMethod, Script>>,
    connected: Cell<bool>,
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self {
            sink: RefCell::new(None),
            outbox: RefCell::new(Vec::new()),
            scripts: RefCell::new(HashMap::new()),
            connected: Cell::new(true),
        }
    }
}

impl LoopbackChannel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Answer every future call to `name` with `reply(payload)`.
    ///
    /// The answer is delivered before `post` returns.
    pub fn answer(
        &self,
        name: impl Into<ServiceMethod>,
        reply: impl Fn(Option<&Value>) -> std::result::Result<Value, HostFailure> + 'static,
    ) {
        self.scripts.borrow_mut().insert(name.into(), Rc::new(reply));
    }

    /// Stop answering `name` automatically.
    pub fn forget(&self, name: impl Into<ServiceMethod>) {
        self.scripts.borrow_mut().remove(&name.into());
    }

    /// Make every later `post` fail with `BridgeError::Transport`.
    pub fn disconnect(&self) {
        debug!("Loopback host disconnected");
        self.connected.set(false);
    }

    pub fn reconnect(&self) {
        self.connected.set(true);
    }

    pub fn is_attached(&self) -> bool {
        self.sink
            .borrow()
            .as_ref()
            .map(|sink| sink.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Deliver a successful response or a stream push.
    pub fn respond(&self, id: CorrelationId, payload: Value) {
        self.deliver(InboundMessage::ok(id, payload));
    }

    /// Alias of [`respond`](Self::respond) that reads better for streams.
    pub fn push(&self, id: CorrelationId, payload: Value) {
        self.respond(id, payload);
    }

    /// Deliver a host-reported failure.
    pub fn fail(&self, id: CorrelationId, code: i32, message: impl Into<String>) {
        self.deliver(InboundMessage::failed(id, code, message));
    }

    /// Deliver an arbitrary inbound message.
    pub fn deliver(&self, message: InboundMessage) {
        match self.sink() {
            Some(sink) => sink.deliver(message),
            None => trace!(id = %message.id, "No sink attached; inbound message lost"),
        }
    }

    /// Report the host as initialized.
    pub fn signal_ready(&self) {
        if let Some(sink) = self.sink() {
            sink.signal_ready();
        }
    }

    /// Everything posted so far, oldest first. The outbox is left empty.
    pub fn take_sent(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.outbox.borrow().clone()
    }

    pub fn last_sent(&self) -> Option<OutboundMessage> {
        self.outbox.borrow().last().cloned()
    }

    /// Posted envelopes addressed to `name`, oldest first.
    pub fn sent_to(&self, name: &str) -> Vec<OutboundMessage> {
        self.outbox
            .borrow()
            .iter()
            .filter(|message| message.name.as_str() == name)
            .cloned()
            .collect()
    }

    /// Correlation ID of the most recent `kind` envelope addressed to `name`.
    pub fn last_id(&self, kind: OutboundKind, name: &str) -> Option<CorrelationId> {
        self.outbox
            .borrow()
            .iter()
            .rev()
            .find(|message| message.kind == kind && message.name.as_str() == name)
            .and_then(|message| message.id)
    }

    fn sink(&self) -> Option<Rc<dyn InboundSink>> {
        self.sink.borrow().as_ref().and_then(Weak::upgrade)
    }
}

impl HostChannel for LoopbackChannel {
    fn post(&self, message: OutboundMessage) -> Result<()> {
        if !self.connected.get() {
            return Err(BridgeError::transport(format!(
                "loopback host is disconnected; {} not delivered",
                message.name
            )));
        }

        trace!(kind = ?message.kind, name = %message.name, "Loopback received envelope");

        let scripted = match (message.kind, message.id) {
            (OutboundKind::Call, Some(id)) => self
                .scripts
                .borrow()
                .get(&message.name)
                .cloned()
                .map(|script| (id, script)),
            _ => None,
        };

        let payload = message.payload.clone();
        self.outbox.borrow_mut().push(message);

        if let Some((id, script)) = scripted {
            match script(payload.as_ref()) {
                Ok(value) => self.respond(id, value),
                Err(failure) => self.fail(id, failure.code, failure.message),
            }
        }

        Ok(())
    }

    fn attach(&self, sink: Weak<dyn InboundSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }
}
