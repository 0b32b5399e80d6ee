//! Audio Recorder
//!
//! Microphone capture through `RecordService`. Listening streams input
//! levels for a meter; recording happens on the host, and [`AudioRecorder::stop`]
//! fetches the finished clip as raw bytes.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bridge_traits::{BridgeError, ServiceMethod};
use bytes::Bytes;
use core_bridge::{BridgeContext, BridgeTransport};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};
use crate::lifecycle::{DisableStep, EnableStep, PermissionStep, StreamLifecycle};

const SERVICE: &str = "RecordService";

/// Raw level pushes are scaled by this before taking the square root.
const LEVEL_SCALE: f64 = 0.55;

fn method(name: &str) -> ServiceMethod {
    ServiceMethod::join(SERVICE, name)
}

/// Receives the recorder's events. Nothing is delivered after disposal.
pub trait RecorderObserver {
    fn on_started(&self);
    fn on_level(&self, level: f64);
    fn on_error(&self, error: &AdapterError);
}

struct RecorderShared {
    lifecycle: RefCell<StreamLifecycle>,
    observer: RefCell<Option<Rc<dyn RecorderObserver>>>,
    recording: Cell<bool>,
}

impl RecorderShared {
    fn observer(&self) -> Option<Rc<dyn RecorderObserver>> {
        if self.lifecycle.borrow().is_disposed() {
            return None;
        }
        self.observer.borrow().clone()
    }

    fn report(&self, error: AdapterError) {
        match self.observer() {
            Some(observer) => observer.on_error(&error),
            None => debug!(%error, "Recorder error after disposal ignored"),
        }
    }

    fn handle_level(&self, payload: Value) {
        if !self.lifecycle.borrow().is_subscribed() {
            return;
        }
        let raw = match payload.as_f64() {
            Some(raw) if raw > 0.0 => raw,
            _ => return,
        };
        if let Some(observer) = self.observer() {
            observer.on_level((raw / LEVEL_SCALE).sqrt());
        }
    }
}

/// Microphone adapter.
pub struct AudioRecorder {
    transport: BridgeTransport,
    shared: Rc<RecorderShared>,
}

impl AudioRecorder {
    pub fn new(context: &BridgeContext) -> Self {
        Self {
            transport: context.transport().clone(),
            shared: Rc::new(RecorderShared {
                lifecycle: RefCell::new(StreamLifecycle::new()),
                observer: RefCell::new(None),
                recording: Cell::new(false),
            }),
        }
    }

    /// Ask for microphone permission and, once granted, start streaming
    /// levels to `observer`.
    ///
    /// The permission request is sent before this returns. The returned
    /// future completes when the attempt settles; outcomes, including a
    /// denial, are reported through `observer`.
    pub fn start_listening(&self, observer: Rc<dyn RecorderObserver>) -> impl Future<Output = ()> {
        let step = self.shared.lifecycle.borrow_mut().request_enable();
        if step != EnableStep::Ignored {
            *self.shared.observer.borrow_mut() = Some(observer);
        }

        let attempt = match step {
            EnableStep::RequestPermission(ticket) => {
                Some((ticket, self.transport.call(method("requestPermission"), None)))
            }
            other => {
                debug!(step = ?other, "Recorder listen request needs no new permission");
                None
            }
        };

        let transport = self.transport.clone();
        let shared = Rc::clone(&self.shared);

        async move {
            let Some((ticket, permission)) = attempt else {
                return;
            };

            let granted = match permission.await {
                Ok(value) => is_granted(&value),
                Err(err) => {
                    if shared.lifecycle.borrow_mut().permission_failed(ticket) {
                        shared.report(err.into());
                    }
                    return;
                }
            };

            let step = shared.lifecycle.borrow_mut().permission_settled(ticket, granted);
            match step {
                PermissionStep::Subscribe => subscribe(&transport, &shared),
                PermissionStep::Denied => {
                    shared.report(AdapterError::permission_denied("microphone"))
                }
                PermissionStep::Abandon | PermissionStep::Discard => {
                    debug!(step = ?step, "Microphone permission result not applied")
                }
            }
        }
    }

    /// Stop streaming levels. Deferred if permission is still pending.
    pub fn stop_listening(&self) {
        let step = self.shared.lifecycle.borrow_mut().request_disable();
        if let DisableStep::Release(id) = step {
            self.transport.die(id);
        }
    }

    pub fn is_listening(&self) -> bool {
        self.shared.lifecycle.borrow().is_subscribed()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.get()
    }

    pub fn start_recording(&self) {
        if self.shared.lifecycle.borrow().is_disposed() {
            return;
        }
        self.shared.recording.set(true);
        self.transport.run(method("start"), None);
    }

    /// Stop recording and fetch the clip.
    ///
    /// # Errors
    ///
    /// - `NoRecording` if the host has nothing to return, or the recorder
    ///   was disposed (nothing is sent to the host then)
    /// - `Bridge(Decode)` if the clip is not valid base64
    /// - `Bridge(..)` for any transport or host failure
    pub async fn stop(&self) -> Result<Bytes> {
        self.shared.recording.set(false);
        if self.shared.lifecycle.borrow().is_disposed() {
            debug!("Ignoring stop on disposed recorder");
            return Err(AdapterError::NoRecording);
        }
        self.transport.run(method("stop"), None);

        let data = self.transport.call(method("data"), None).await?;
        let encoded = match data {
            Value::String(text) if !text.is_empty() => text,
            Value::Null | Value::String(_) => return Err(AdapterError::NoRecording),
            other => {
                return Err(BridgeError::decode(format!(
                    "recording must be base64 text, got {}",
                    other
                ))
                .into())
            }
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| BridgeError::decode(format!("recording is not valid base64: {}", e)))?;
        debug!(bytes = bytes.len(), "Recording fetched");
        Ok(Bytes::from(bytes))
    }

    /// Release the microphone. Nothing reaches the observer afterwards.
    pub fn dispose(&self) {
        if self.shared.lifecycle.borrow().is_disposed() {
            return;
        }
        let live = self.shared.lifecycle.borrow_mut().dispose();
        self.shared.observer.borrow_mut().take();
        if let Some(id) = live {
            self.transport.die(id);
        }
        self.transport.run(method("dispose"), None);
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lifecycle.borrow().is_disposed()
    }
}

fn subscribe(transport: &BridgeTransport, shared: &Rc<RecorderShared>) {
    let weak: Weak<RecorderShared> = Rc::downgrade(shared);
    let subscribed = transport.live(method("listen"), move |payload| {
        if let Some(shared) = weak.upgrade() {
            shared.handle_level(payload);
        }
    });

    match subscribed {
        Ok(id) => {
            if shared.lifecycle.borrow_mut().attach(id) {
                if let Some(observer) = shared.observer() {
                    observer.on_started();
                }
            } else {
                transport.die(id);
            }
        }
        Err(err) => {
            warn!(error = %err, "Could not open level stream");
            shared.lifecycle.borrow_mut().subscribe_failed();
            shared.report(err.into());
        }
    }
}

/// The host answers with a number; anything below 1 is a refusal.
fn is_granted(value: &Value) -> bool {
    let level = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    level >= 1.0
}
