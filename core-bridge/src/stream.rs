//! Cancellable push streams.
//!
//! A [`LiveStream`] is the stream form of a subscription: lazy, not
//! restartable, and finished for good once its subscription dies. Pushes
//! still buffered at that moment are dropped, never yielded.

use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use bridge_traits::CorrelationId;
use futures::channel::mpsc;
use futures::Stream;
use serde_json::Value;

use crate::transport::{BridgeTransport, Inner};

/// Push-stream subscription consumed as a [`Stream`] of payloads.
///
/// Dropping the stream cancels the subscription.
pub struct LiveStream {
    id: CorrelationId,
    receiver: mpsc::UnboundedReceiver<Value>,
    transport: Weak<Inner>,
    finished: bool,
}

impl LiveStream {
    pub(crate) fn new(
        id: CorrelationId,
        receiver: mpsc::UnboundedReceiver<Value>,
        transport: Weak<Inner>,
    ) -> Self {
        Self {
            id,
            receiver,
            transport,
            finished: false,
        }
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Whether the underlying subscription is still registered.
    pub fn is_live(&self) -> bool {
        !self.finished
            && self
                .transport
                .upgrade()
                .map(|inner| inner.is_subscribed(self.id))
                .unwrap_or(false)
    }

    /// Cancel the subscription now. Same as dropping the stream.
    pub fn cancel(self) {}
}

impl Stream for LiveStream {
    type Item = Value;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if !this.is_live() {
            this.finished = true;
            this.receiver.close();
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.receiver).poll_next(cx) {
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        if let Some(inner) = self.transport.upgrade() {
            BridgeTransport::from_inner(inner).die(self.id);
        }
    }
}
