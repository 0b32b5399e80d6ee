//! Permission-Gated Stream Lifecycle
//!
//! The state machine every device adapter runs: ask for permission, subscribe
//! once granted, release on stop, and refuse everything after disposal.
//!
//! ```text
//!            request_enable              granted + attach
//!   Idle ───────────────────► Awaiting ───────────────────► Subscribed
//!    ▲                           │ denied / abandoned            │
//!    └───────────────────────────┴───────────────────────────────┘
//!                                               request_disable
//!
//!   any state ── dispose ──► Disposed (terminal)
//! ```
//!
//! The machine does no I/O. Each transition returns a step telling the
//! adapter what to send, which keeps every transition synchronous: there is
//! never an await between deciding and mutating.
//!
//! Permission requests carry a [`Ticket`]. A result that arrives for an
//! attempt that is no longer current (disposed, or superseded after a denial
//! and a fresh request) is discarded.

use bridge_traits::CorrelationId;

/// Identifies one permission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    /// Permission requested; `wanted` is false once a disable arrived
    /// during setup.
    AwaitingPermission { ticket: Ticket, wanted: bool },
    Subscribed(CorrelationId),
    Disposed,
}

/// Result of [`StreamLifecycle::request_enable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableStep {
    /// Send the permission request for this attempt.
    RequestPermission(Ticket),
    /// Setup already in flight; it will go ahead.
    AlreadyPending,
    AlreadyActive,
    /// Disposed.
    Ignored,
}

/// Result of [`StreamLifecycle::permission_settled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStep {
    /// Open the subscription, then [`attach`](StreamLifecycle::attach) it.
    Subscribe,
    /// Refused; back to idle. Report the denial.
    Denied,
    /// Granted, but disabled while waiting; back to idle without subscribing.
    Abandon,
    /// Stale or disposed; do nothing at all.
    Discard,
}

/// Result of [`StreamLifecycle::request_disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableStep {
    /// Cancel this subscription and tell the host to stop.
    Release(CorrelationId),
    /// Setup in flight; applied when the permission result arrives unless
    /// re-enabled first.
    Deferred,
    Nothing,
}

#[derive(Debug)]
pub struct StreamLifecycle {
    state: LifecycleState,
    next_ticket: u64,
}

impl Default for StreamLifecycle {
    fn default() -> Self {
        Self {
            state: LifecycleState::Idle,
            next_ticket: 1,
        }
    }
}

impl StreamLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == LifecycleState::Disposed
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, LifecycleState::Subscribed(_))
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, LifecycleState::AwaitingPermission { .. })
    }

    /// Whether the consumer currently wants the stream running.
    pub fn is_enabled(&self) -> bool {
        match self.state {
            LifecycleState::Subscribed(_) => true,
            LifecycleState::AwaitingPermission { wanted, .. } => wanted,
            LifecycleState::Idle | LifecycleState::Disposed => false,
        }
    }

    pub fn subscription(&self) -> Option<CorrelationId> {
        match self.state {
            LifecycleState::Subscribed(id) => Some(id),
            _ => None,
        }
    }

    pub fn request_enable(&mut self) -> EnableStep {
        match &mut self.state {
            LifecycleState::Idle => {
                let ticket = Ticket(self.next_ticket);
                self.next_ticket += 1;
                self.state = LifecycleState::AwaitingPermission {
                    ticket,
                    wanted: true,
                };
                EnableStep::RequestPermission(ticket)
            }
            LifecycleState::AwaitingPermission { wanted, .. } => {
                *wanted = true;
                EnableStep::AlreadyPending
            }
            LifecycleState::Subscribed(_) => EnableStep::AlreadyActive,
            LifecycleState::Disposed => EnableStep::Ignored,
        }
    }

    pub fn permission_settled(&mut self, ticket: Ticket, granted: bool) -> PermissionStep {
        let wanted = match self.state {
            LifecycleState::AwaitingPermission { ticket: current, wanted } if current == ticket => {
                wanted
            }
            _ => return PermissionStep::Discard,
        };

        if !granted {
            self.state = LifecycleState::Idle;
            PermissionStep::Denied
        } else if !wanted {
            self.state = LifecycleState::Idle;
            PermissionStep::Abandon
        } else {
            PermissionStep::Subscribe
        }
    }

    /// The permission request itself failed; back to idle if still current.
    pub fn permission_failed(&mut self, ticket: Ticket) -> bool {
        match self.state {
            LifecycleState::AwaitingPermission { ticket: current, .. } if current == ticket => {
                self.state = LifecycleState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Record the subscription opened after [`PermissionStep::Subscribe`].
    ///
    /// Returns false if the machine moved on in the meantime; the caller must
    /// then cancel `id` itself.
    pub fn attach(&mut self, id: CorrelationId) -> bool {
        match self.state {
            LifecycleState::AwaitingPermission { wanted: true, .. } => {
                self.state = LifecycleState::Subscribed(id);
                true
            }
            _ => false,
        }
    }

    /// Opening the subscription failed after permission was granted.
    pub fn subscribe_failed(&mut self) {
        if self.is_awaiting() {
            self.state = LifecycleState::Idle;
        }
    }

    pub fn request_disable(&mut self) -> DisableStep {
        match &mut self.state {
            LifecycleState::Subscribed(id) => {
                let id = *id;
                self.state = LifecycleState::Idle;
                DisableStep::Release(id)
            }
            LifecycleState::AwaitingPermission { wanted, .. } => {
                *wanted = false;
                DisableStep::Deferred
            }
            LifecycleState::Idle | LifecycleState::Disposed => DisableStep::Nothing,
        }
    }

    /// Enter the terminal state. Returns the subscription to cancel, if any.
    pub fn dispose(&mut self) -> Option<CorrelationId> {
        let previous = std::mem::replace(&mut self.state, LifecycleState::Disposed);
        match previous {
            LifecycleState::Subscribed(id) => Some(id),
            _ => None,
        }
    }
}
