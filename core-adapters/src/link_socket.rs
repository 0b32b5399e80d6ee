//! Link Socket
//!
//! A message socket to hardware peers (`LinkService`), shaped like the
//! socket interface extension code expects: handlers are installed first,
//! then the socket is opened. Incoming messages arrive as JSON text pushes
//! on one subscription.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bridge_traits::{BridgeError, CorrelationId, ServiceMethod};
use core_bridge::{BridgeContext, BridgeTransport};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

const SERVICE: &str = "LinkService";

fn method(name: &str) -> ServiceMethod {
    ServiceMethod::join(SERVICE, name)
}

type Notify = Rc<dyn Fn()>;
type OnError = Rc<dyn Fn(AdapterError)>;
type OnMessage = Rc<dyn Fn(Value)>;

#[derive(Default)]
struct Handlers {
    on_open: Option<Notify>,
    on_close: Option<Notify>,
    on_error: Option<OnError>,
    on_message: Option<OnMessage>,
}

#[derive(Default)]
struct SocketShared {
    handlers: RefCell<Handlers>,
    live: Cell<Option<CorrelationId>>,
}

impl SocketShared {
    fn handle_push(&self, payload: Value) {
        let decoded = match payload {
            Value::String(text) => serde_json::from_str::<Value>(&text).map_err(|e| {
                BridgeError::decode(format!("link message is not valid JSON: {}", e))
            }),
            other => Ok(other),
        };

        match decoded {
            Ok(message) => {
                let handler = self.handlers.borrow().on_message.clone();
                if let Some(handler) = handler {
                    handler(message);
                }
            }
            Err(err) => {
                warn!(error = %err, "Undecodable link message");
                let handler = self.handlers.borrow().on_error.clone();
                if let Some(handler) = handler {
                    handler(err.into());
                }
            }
        }
    }
}

/// Socket to a peer device, carried over the bridge.
pub struct LinkSocket {
    transport: BridgeTransport,
    kind: String,
    shared: Rc<SocketShared>,
}

impl LinkSocket {
    /// `kind` names the peer family (for example `"BLE"` or `"BT"`).
    pub fn new(context: &BridgeContext, kind: impl Into<String>) -> Self {
        Self {
            transport: context.transport().clone(),
            kind: kind.into(),
            shared: Rc::new(SocketShared::default()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn set_on_open(&self, handler: impl Fn() + 'static) {
        self.shared.handlers.borrow_mut().on_open = Some(Rc::new(handler));
    }

    pub fn set_on_close(&self, handler: impl Fn() + 'static) {
        self.shared.handlers.borrow_mut().on_close = Some(Rc::new(handler));
    }

    pub fn set_on_error(&self, handler: impl Fn(AdapterError) + 'static) {
        self.shared.handlers.borrow_mut().on_error = Some(Rc::new(handler));
    }

    pub fn set_handle_message(&self, handler: impl Fn(Value) + 'static) {
        self.shared.handlers.borrow_mut().on_message = Some(Rc::new(handler));
    }

    /// Open the socket and start receiving messages.
    ///
    /// Opening an already open socket does nothing.
    ///
    /// # Errors
    ///
    /// - `SocketHandlersMissing` unless all four handlers are set
    /// - `Bridge(Transport)` if the subscription could not be sent
    pub fn open(&self) -> Result<()> {
        let on_open = {
            let handlers = self.shared.handlers.borrow();
            match (
                &handlers.on_open,
                &handlers.on_close,
                &handlers.on_error,
                &handlers.on_message,
            ) {
                (Some(on_open), Some(_), Some(_), Some(_)) => Rc::clone(on_open),
                _ => return Err(AdapterError::SocketHandlersMissing),
            }
        };

        if self.is_open() {
            return Ok(());
        }

        let weak: Weak<SocketShared> = Rc::downgrade(&self.shared);
        let id = self.transport.live(method("open"), move |payload| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_push(payload);
            }
        })?;
        self.shared.live.set(Some(id));
        debug!(%id, kind = %self.kind, "Link socket open");

        on_open();
        Ok(())
    }

    /// Close the socket and tell the host. The close handler runs if the
    /// socket was open.
    pub fn close(&self) {
        let Some(id) = self.shared.live.take() else {
            return;
        };
        self.transport.die(id);
        self.transport.run(method("close"), None);
        debug!(%id, kind = %self.kind, "Link socket closed");

        let on_close = self.shared.handlers.borrow().on_close.clone();
        if let Some(on_close) = on_close {
            on_close();
        }
    }

    pub fn send_message(&self, message: Value) {
        self.transport.run(method("send"), Some(message));
    }

    pub fn is_open(&self) -> bool {
        self.shared.live.get().is_some()
    }
}

impl Drop for LinkSocket {
    fn drop(&mut self) {
        if let Some(id) = self.shared.live.take() {
            self.transport.die(id);
            self.transport.run(method("close"), None);
        }
    }
}
