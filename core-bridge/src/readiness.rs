//! Readiness Gate
//!
//! Holds work back until the host reports that its side of the bridge is
//! initialized. Callbacks queued before that moment run exactly once, in
//! registration order, when [`ReadinessGate::mark_ready`] is first called;
//! callbacks registered afterwards run immediately.
//!
//! If the host never becomes ready, queued callbacks never run. That is not
//! a failure.

use futures::channel::oneshot;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

type Deferred = Box<dyn FnOnce()>;

#[derive(Default)]
struct ReadinessState {
    ready: bool,
    queue: Vec<Deferred>,
}

/// Cheaply cloneable handle; all clones share one state.
#[derive(Clone, Default)]
pub struct ReadinessGate {
    state: Rc<RefCell<ReadinessState>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    /// Run `callback` once the host is ready, or right now if it already is.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        if !state.ready {
            state.queue.push(Box::new(callback));
            return;
        }
        drop(state);
        callback();
    }

    /// Record readiness and flush the queue. Later calls do nothing.
    pub fn mark_ready(&self) {
        let queued = {
            let mut state = self.state.borrow_mut();
            if state.ready {
                return;
            }
            state.ready = true;
            std::mem::take(&mut state.queue)
        };

        debug!(deferred = queued.len(), "Host bridge ready");
        for callback in queued {
            callback();
        }
    }

    /// Future form of [`on_ready`](Self::on_ready).
    ///
    /// Stays pending forever if the gate is dropped without becoming ready.
    pub fn ready(&self) -> impl Future<Output = ()> {
        let (tx, rx) = oneshot::channel::<()>();
        self.on_ready(move || {
            let _ = tx.send(());
        });
        async move {
            if rx.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_deferred_callbacks_run_once_in_order() {
        let gate = ReadinessGate::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let log = Rc::clone(&log);
            gate.on_ready(move || log.borrow_mut().push(n));
        }
        assert!(log.borrow().is_empty());

        gate.mark_ready();
        gate.mark_ready();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_registration_after_ready_runs_immediately() {
        let gate = ReadinessGate::new();
        gate.mark_ready();

        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        gate.on_ready(move || counter.set(counter.get() + 1));
        assert_eq!(hits.get(), 1);

        gate.mark_ready();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_callback_may_register_another() {
        let gate = ReadinessGate::new();
        let hits = Rc::new(Cell::new(0));

        let inner_gate = gate.clone();
        let counter = Rc::clone(&hits);
        gate.on_ready(move || {
            let counter = Rc::clone(&counter);
            inner_gate.on_ready(move || counter.set(counter.get() + 1));
        });

        gate.mark_ready();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_never_ready_never_runs() {
        let gate = ReadinessGate::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        gate.on_ready(move || counter.set(1));
        drop(gate);
        assert_eq!(hits.get(), 0);
    }

    #[tokio::test]
    async fn test_ready_future() {
        let gate = ReadinessGate::new();
        let waiting = gate.ready();
        gate.mark_ready();
        waiting.await;
        assert!(gate.is_ready());
    }
}
