//! Bridge Transport Core
//!
//! Implements the four bridge primitives on top of a [`HostChannel`] and the
//! [`CorrelationRegistry`]. This is the single source of truth for the
//! lifecycle of every request and subscription.
//!
//! Registry mutations happen synchronously inside each primitive, before the
//! envelope leaves, so a response can be matched even if the host answers
//! from inside `post`. No registry borrow is ever held while the channel or a
//! subscriber callback runs.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use bridge_traits::{
    BridgeError, CorrelationId, HostChannel, InboundMessage, OutboundMessage, Result,
    ServiceMethod,
};
use core_runtime::logging::summarize_payload;
use futures::channel::{mpsc, oneshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::registry::{CorrelationRegistry, Route};
use crate::stream::LiveStream;

/// Callback invoked with each push of a subscription.
pub type EventHandler = Rc<dyn Fn(Value)>;

type Settle = oneshot::Sender<Result<Value>>;

#[derive(Clone)]
struct Subscriber {
    name: ServiceMethod,
    handler: EventHandler,
}

pub(crate) struct Inner {
    channel: Rc<dyn HostChannel>,
    registry: RefCell<CorrelationRegistry<Settle, Subscriber>>,
    closed: Cell<bool>,
}

/// Handle to the bridge transport. Clones share the same registry.
#[derive(Clone)]
pub struct BridgeTransport {
    inner: Rc<Inner>,
}

impl BridgeTransport {
    pub fn new(channel: Rc<dyn HostChannel>) -> Self {
        Self {
            inner: Rc::new(Inner {
                channel,
                registry: RefCell::new(CorrelationRegistry::new()),
                closed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<Inner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    /// Issue an await-one-response call.
    ///
    /// The request is registered and transmitted before this returns; the
    /// returned future only waits for the answer. Dropping it before it
    /// settles removes the registration, so a late answer is discarded.
    ///
    /// # Errors
    ///
    /// The future resolves to:
    /// - `BridgeError::Transport` if the channel refused the envelope or the
    ///   transport was shut down
    /// - `BridgeError::Host` if the host reported a failure for this call
    pub fn call(&self, name: impl Into<ServiceMethod>, payload: Option<Value>) -> PendingCall {
        let name = name.into();

        if self.inner.closed.get() {
            return PendingCall::failed(BridgeError::transport(format!(
                "bridge is shut down; cannot call {}",
                name
            )));
        }

        let (tx, rx) = oneshot::channel();
        let id = {
            let mut registry = self.inner.registry.borrow_mut();
            let id = registry.allocate();
            registry.insert_pending(id, tx);
            id
        };

        debug!(%id, %name, "Issuing call");

        if let Err(err) = self.inner.channel.post(OutboundMessage::call(name, id, payload)) {
            self.inner.registry.borrow_mut().take_pending(id);
            warn!(%id, error = %err, "Host channel refused call");
            return PendingCall::failed(as_transport(err));
        }

        PendingCall {
            id: Some(id),
            state: CallState::Waiting(rx),
            inner: self.downgrade(),
        }
    }

    /// Like [`call`](Self::call), decoding the response as structured data.
    ///
    /// A string response is parsed as JSON text; any other payload is
    /// converted directly. Failure to do either is `BridgeError::Decode`.
    pub fn call_json<T: DeserializeOwned>(
        &self,
        name: impl Into<ServiceMethod>,
        payload: Option<Value>,
    ) -> impl Future<Output = Result<T>> {
        let pending = self.call(name, payload);
        async move { decode_json(pending.await?) }
    }

    /// Fire-and-forget call. Nothing is registered and no failure reaches
    /// the caller; transmission problems are only logged.
    pub fn run(&self, name: impl Into<ServiceMethod>, payload: Option<Value>) {
        let name = name.into();
        if self.inner.closed.get() {
            debug!(%name, "Ignoring run on shut down bridge");
            return;
        }
        trace!(%name, "Running");
        self.post_best_effort(OutboundMessage::run(name, payload));
    }

    /// Open a push-stream subscription.
    ///
    /// Returns as soon as the subscribe request is sent. Every later push
    /// tagged with the returned ID invokes `handler`, in host order, until
    /// [`die`](Self::die) is called.
    ///
    /// # Errors
    ///
    /// `BridgeError::Transport` if the subscribe request could not be sent;
    /// nothing stays registered in that case.
    pub fn live(
        &self,
        name: impl Into<ServiceMethod>,
        handler: impl Fn(Value) + 'static,
    ) -> Result<CorrelationId> {
        let name = name.into();

        if self.inner.closed.get() {
            return Err(BridgeError::transport(format!(
                "bridge is shut down; cannot subscribe to {}",
                name
            )));
        }

        let id = {
            let mut registry = self.inner.registry.borrow_mut();
            let id = registry.allocate();
            registry.insert_subscription(
                id,
                Subscriber {
                    name: name.clone(),
                    handler: Rc::new(handler),
                },
            );
            id
        };

        debug!(%id, %name, "Opening subscription");

        if let Err(err) = self.inner.channel.post(OutboundMessage::subscribe(name, id)) {
            let _unregistered = self.inner.registry.borrow_mut().remove_subscription(id);
            warn!(%id, error = %err, "Host channel refused subscription");
            return Err(as_transport(err));
        }

        Ok(id)
    }

    /// Subscribe and consume the pushes as a [`LiveStream`].
    pub fn live_stream(&self, name: impl Into<ServiceMethod>) -> Result<LiveStream> {
        let (tx, rx) = mpsc::unbounded();
        let id = self.live(name, move |payload| {
            let _ = tx.unbounded_send(payload);
        })?;
        Ok(LiveStream::new(id, rx, self.downgrade()))
    }

    /// Cancel a subscription.
    ///
    /// Takes effect locally before this returns: no push for `id` reaches its
    /// handler afterwards, whatever the host still has in flight. Unknown or
    /// already cancelled IDs are a no-op.
    pub fn die(&self, id: CorrelationId) {
        let removed = self.inner.registry.borrow_mut().remove_subscription(id);
        match removed {
            Some(subscriber) => {
                debug!(%id, name = %subscriber.name, "Closing subscription");
                self.post_best_effort(OutboundMessage::unsubscribe(subscriber.name, id));
            }
            None => trace!(%id, "die on unknown or dead subscription"),
        }
    }

    /// Route one inbound message from the host.
    pub fn dispatch(&self, message: InboundMessage) {
        let id = message.id;
        let route = self.inner.registry.borrow_mut().route(id);

        match route {
            Route::Pending(settle) => {
                let result = message.into_result();
                match &result {
                    Ok(payload) => {
                        debug!(%id, payload = %summarize_payload(payload), "Call settled")
                    }
                    Err(err) => debug!(%id, error = %err, "Call failed on host"),
                }
                if settle.send(result).is_err() {
                    trace!(%id, "Caller went away before the response arrived");
                }
            }
            Route::Subscription(subscriber) => {
                if let Some(failure) = message.error {
                    warn!(
                        %id,
                        name = %subscriber.name,
                        code = failure.code,
                        reason = %failure.message,
                        "Dropping error push; subscriptions have no error channel"
                    );
                    return;
                }
                trace!(%id, "Delivering push");
                (subscriber.handler)(message.payload);
            }
            Route::Unknown => {
                trace!(%id, "Discarding message for unknown or finished correlation")
            }
        }
    }

    /// Tear the transport down.
    ///
    /// Every pending call fails with `BridgeError::Transport`, every
    /// subscription is cancelled, and later primitives fail fast.
    pub fn shutdown(&self) {
        if self.inner.closed.replace(true) {
            return;
        }

        let (pending, subscriptions) = self.inner.registry.borrow_mut().drain();
        debug!(
            pending = pending.len(),
            subscriptions = subscriptions.len(),
            "Shutting down bridge transport"
        );

        for (_, settle) in pending {
            let _ = settle.send(Err(BridgeError::transport("bridge shut down")));
        }
        for (id, subscriber) in subscriptions {
            self.post_best_effort(OutboundMessage::unsubscribe(subscriber.name, id));
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.get()
    }

    /// Number of calls still waiting for the host.
    pub fn pending_calls(&self) -> usize {
        self.inner.registry.borrow().pending_len()
    }

    /// Number of open subscriptions.
    pub fn live_subscriptions(&self) -> usize {
        self.inner.registry.borrow().subscription_len()
    }

    pub fn is_live(&self, id: CorrelationId) -> bool {
        self.inner.registry.borrow().is_subscribed(id)
    }

    fn post_best_effort(&self, message: OutboundMessage) {
        let name = message.name.clone();
        if let Err(err) = self.inner.channel.post(message) {
            warn!(%name, error = %err, "Host channel refused envelope");
        }
    }
}

impl Inner {
    pub(crate) fn is_subscribed(&self, id: CorrelationId) -> bool {
        self.registry
            .try_borrow()
            .map(|registry| registry.is_subscribed(id))
            .unwrap_or(false)
    }

    fn abandon(&self, id: CorrelationId) {
        if let Ok(mut registry) = self.registry.try_borrow_mut() {
            if registry.take_pending(id).is_some() {
                trace!(%id, "Call abandoned by caller");
            }
        }
    }
}

/// Decode a bridge payload as structured data.
pub fn decode_json<T: DeserializeOwned>(payload: Value) -> Result<T> {
    match payload {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| BridgeError::decode(format!("response is not valid JSON: {}", e))),
        other => serde_json::from_value(other)
            .map_err(|e| BridgeError::decode(format!("unexpected response shape: {}", e))),
    }
}

fn as_transport(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Transport(_) => err,
        other => BridgeError::Transport(other.to_string()),
    }
}

enum CallState {
    Waiting(oneshot::Receiver<Result<Value>>),
    Failed(Option<BridgeError>),
    Done,
}

/// Future returned by [`BridgeTransport::call`].
#[must_use = "a call's response is lost unless the PendingCall is awaited"]
pub struct PendingCall {
    id: Option<CorrelationId>,
    state: CallState,
    inner: Weak<Inner>,
}

impl PendingCall {
    fn failed(err: BridgeError) -> Self {
        Self {
            id: None,
            state: CallState::Failed(Some(err)),
            inner: Weak::new(),
        }
    }

    /// Correlation ID of the request, while it is still outstanding.
    pub fn id(&self) -> Option<CorrelationId> {
        self.id
    }
}

impl Future for PendingCall {
    type Output = Result<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let output = match &mut this.state {
            CallState::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(result)) => result,
                Poll::Ready(Err(oneshot::Canceled)) => Err(BridgeError::transport(
                    "bridge dropped the request before the host answered",
                )),
            },
            CallState::Failed(err) => Err(err
                .take()
                .unwrap_or_else(|| BridgeError::transport("call already failed"))),
            CallState::Done => Err(BridgeError::transport("call polled after completion")),
        };

        this.id = None;
        this.state = CallState::Done;
        Poll::Ready(output)
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.inner.upgrade()) {
            inner.abandon(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::OutboundKind;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingChannel {
        sent: RefCell<Vec<OutboundMessage>>,
    }

    impl HostChannel for RecordingChannel {
        fn post(&self, message: OutboundMessage) -> Result<()> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    #[test]
    fn test_call_registers_before_returning() {
        let channel = Rc::new(RecordingChannel::default());
        let transport = BridgeTransport::new(channel.clone());

        let pending = transport.call("RecordService@data", None);
        assert_eq!(transport.pending_calls(), 1);
        assert_eq!(channel.sent.borrow()[0].kind, OutboundKind::Call);
        assert_eq!(pending.id(), channel.sent.borrow()[0].id);

        drop(pending);
        assert_eq!(transport.pending_calls(), 0);
    }

    #[test]
    fn test_decode_json() {
        let parsed: Value = decode_json(json!("{\"a\":1}")).unwrap();
        assert_eq!(parsed, json!({"a": 1}));

        let direct: Vec<u8> = decode_json(json!([1, 2])).unwrap();
        assert_eq!(direct, vec![1, 2]);

        let missing: Option<Value> = decode_json(json!("null")).unwrap();
        assert!(missing.is_none());

        assert!(matches!(
            decode_json::<Value>(json!("not json")),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn test_as_transport_preserves_transport() {
        let err = as_transport(BridgeError::transport("gone"));
        assert_eq!(err, BridgeError::Transport("gone".to_string()));
        assert!(as_transport(BridgeError::decode("bad")).is_transport());
    }
}
