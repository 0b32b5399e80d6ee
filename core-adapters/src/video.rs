//! Video Provider
//!
//! Camera frames through `CameraService`. The host pushes JPEG frames as
//! base64 text; the provider keeps only the most recent one.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bridge_traits::ServiceMethod;
use bytes::Bytes;
use core_bridge::{BridgeContext, BridgeTransport};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{AdapterError, Result};
use crate::lifecycle::{DisableStep, EnableStep, PermissionStep, StreamLifecycle};

const SERVICE: &str = "CameraService";

/// Frame size the host captures at.
pub const DIMENSIONS: (u32, u32) = (480, 360);

fn method(name: &str) -> ServiceMethod {
    ServiceMethod::join(SERVICE, name)
}

/// One decoded camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub jpeg: Bytes,
    /// Position in the push stream, starting at 1
    pub sequence: u64,
}

#[derive(Default)]
struct VideoShared {
    lifecycle: RefCell<StreamLifecycle>,
    latest: RefCell<Option<Frame>>,
    received: Cell<u64>,
}

impl VideoShared {
    fn handle_frame(&self, payload: Value) {
        if !self.lifecycle.borrow().is_subscribed() {
            return;
        }
        let Value::String(encoded) = payload else {
            trace!("Ignoring non-text camera push");
            return;
        };
        match BASE64.decode(encoded.trim()) {
            Ok(jpeg) => {
                let sequence = self.received.get() + 1;
                self.received.set(sequence);
                *self.latest.borrow_mut() = Some(Frame {
                    jpeg: Bytes::from(jpeg),
                    sequence,
                });
            }
            Err(err) => warn!(error = %err, "Dropping undecodable camera frame"),
        }
    }
}

/// Camera adapter.
pub struct VideoProvider {
    transport: BridgeTransport,
    shared: Rc<VideoShared>,
}

impl VideoProvider {
    pub fn new(context: &BridgeContext) -> Self {
        Self {
            transport: context.transport().clone(),
            shared: Rc::new(VideoShared::default()),
        }
    }

    /// Ask for camera permission and start the frame stream once granted.
    ///
    /// Resolves to whether this call got frames flowing. Only one setup runs
    /// at a time: while one is pending, further calls resolve to `Ok(false)`
    /// straight away and the pending attempt carries on.
    ///
    /// # Errors
    ///
    /// - `Bridge(PermissionDenied)` if the user refused
    /// - `Bridge(..)` if the permission request or subscription failed
    pub fn enable_video(&self) -> Pin<Box<dyn Future<Output = Result<bool>>>> {
        let step = self.shared.lifecycle.borrow_mut().request_enable();
        let attempt = match step {
            EnableStep::RequestPermission(ticket) => {
                Some((ticket, self.transport.call(method("requestPermission"), None)))
            }
            EnableStep::AlreadyActive => return Box::pin(std::future::ready(Ok(true))),
            EnableStep::AlreadyPending | EnableStep::Ignored => {
                debug!(step = ?step, "Camera enable needs no new permission");
                None
            }
        };

        let transport = self.transport.clone();
        let shared = Rc::clone(&self.shared);

        Box::pin(async move {
            let Some((ticket, permission)) = attempt else {
                return Ok(false);
            };

            let granted = match permission.await {
                Ok(value) => is_truthy(&value),
                Err(err) => {
                    shared.lifecycle.borrow_mut().permission_failed(ticket);
                    return Err(AdapterError::from(err));
                }
            };

            let step = shared.lifecycle.borrow_mut().permission_settled(ticket, granted);
            match step {
                PermissionStep::Subscribe => subscribe(&transport, &shared),
                PermissionStep::Denied => Err(AdapterError::permission_denied("camera")),
                PermissionStep::Abandon | PermissionStep::Discard => {
                    debug!(step = ?step, "Camera permission result not applied");
                    Ok(false)
                }
            }
        })
    }

    /// Turn the camera off. If setup is still pending, the camera is left
    /// off once it completes unless re-enabled in the meantime.
    pub fn disable_video(&self) {
        let step = self.shared.lifecycle.borrow_mut().request_disable();
        match step {
            DisableStep::Release(id) => {
                self.transport.die(id);
                self.transport.run(method("stop"), None);
                self.shared.latest.borrow_mut().take();
            }
            DisableStep::Deferred => debug!("Camera disable deferred until setup settles"),
            DisableStep::Nothing => {}
        }
    }

    pub fn video_ready(&self) -> bool {
        self.shared.lifecycle.borrow().is_subscribed()
    }

    /// The most recent frame, or `None` while video is not running.
    pub fn get_frame(&self) -> Option<Frame> {
        if !self.video_ready() {
            return None;
        }
        self.shared.latest.borrow().clone()
    }

    pub fn dispose(&self) {
        let live = self.shared.lifecycle.borrow_mut().dispose();
        self.shared.latest.borrow_mut().take();
        if let Some(id) = live {
            self.transport.die(id);
            self.transport.run(method("stop"), None);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lifecycle.borrow().is_disposed()
    }
}

fn subscribe(transport: &BridgeTransport, shared: &Rc<VideoShared>) -> Result<bool> {
    let weak: Weak<VideoShared> = Rc::downgrade(shared);
    let id = match transport.live(method("start"), move |payload| {
        if let Some(shared) = weak.upgrade() {
            shared.handle_frame(payload);
        }
    }) {
        Ok(id) => id,
        Err(err) => {
            shared.lifecycle.borrow_mut().subscribe_failed();
            return Err(err.into());
        }
    };

    if shared.lifecycle.borrow_mut().attach(id) {
        debug!(%id, "Camera streaming");
        Ok(true)
    } else {
        transport.die(id);
        Ok(false)
    }
}

/// Loose truthiness, matching how the host reports a grant.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }
}
