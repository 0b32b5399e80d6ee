//! Correlation Registry
//!
//! Tracks in-flight await-one-response calls and open subscriptions. Pure
//! bookkeeping: no I/O, no callbacks. The transport decides what a pending
//! entry (`P`) or a subscription entry (`S`) actually holds.

use bridge_traits::CorrelationId;
use std::collections::HashMap;

/// Where an inbound message tagged with some ID should go.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<P, S> {
    /// A pending call; its entry has been removed and must be settled now.
    Pending(P),
    /// A live subscription; its entry stays registered.
    Subscription(S),
    /// Unknown, already settled, or already cancelled.
    Unknown,
}

/// Pending calls and subscriptions keyed by one shared ID counter.
pub struct CorrelationRegistry<P, S> {
    next_id: u64,
    pending: HashMap<CorrelationId, P>,
    subscriptions: HashMap<CorrelationId, S>,
}

impl<P, S> Default for CorrelationRegistry<P, S> {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }
}

impl<P, S> CorrelationRegistry<P, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next ID. IDs are never reused.
    pub fn allocate(&mut self) -> CorrelationId {
        let id = CorrelationId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert_pending(&mut self, id: CorrelationId, entry: P) {
        debug_assert!(!self.subscriptions.contains_key(&id));
        self.pending.insert(id, entry);
    }

    pub fn insert_subscription(&mut self, id: CorrelationId, entry: S) {
        debug_assert!(!self.pending.contains_key(&id));
        self.subscriptions.insert(id, entry);
    }

    pub fn take_pending(&mut self, id: CorrelationId) -> Option<P> {
        self.pending.remove(&id)
    }

    pub fn remove_subscription(&mut self, id: CorrelationId) -> Option<S> {
        self.subscriptions.remove(&id)
    }

    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_subscribed(&self, id: CorrelationId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn subscription_len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Empty the registry, returning everything that was still live.
    pub fn drain(&mut self) -> (Vec<(CorrelationId, P)>, Vec<(CorrelationId, S)>) {
        (
            self.pending.drain().collect(),
            self.subscriptions.drain().collect(),
        )
    }
}

impl<P, S: Clone> CorrelationRegistry<P, S> {
    /// Resolve an inbound ID. A pending entry is removed as part of the
    /// lookup, so a duplicate response finds nothing.
    pub fn route(&mut self, id: CorrelationId) -> Route<P, S> {
        if let Some(entry) = self.pending.remove(&id) {
            return Route::Pending(entry);
        }
        match self.subscriptions.get(&id) {
            Some(entry) => Route::Subscription(entry.clone()),
            None => Route::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Registry = CorrelationRegistry<&'static str, &'static str>;

    #[test]
    fn test_ids_are_monotonic_and_shared() {
        let mut registry = Registry::new();
        let call = registry.allocate();
        let sub = registry.allocate();
        let call2 = registry.allocate();
        assert_eq!(call.get(), 1);
        assert!(call < sub && sub < call2);
    }

    #[test]
    fn test_pending_routes_once() {
        let mut registry = Registry::new();
        let id = registry.allocate();
        registry.insert_pending(id, "resolver");

        assert_eq!(registry.route(id), Route::Pending("resolver"));
        assert_eq!(registry.route(id), Route::Unknown);
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn test_subscription_routes_until_removed() {
        let mut registry = Registry::new();
        let id = registry.allocate();
        registry.insert_subscription(id, "handler");

        assert_eq!(registry.route(id), Route::Subscription("handler"));
        assert_eq!(registry.route(id), Route::Subscription("handler"));

        assert_eq!(registry.remove_subscription(id), Some("handler"));
        assert_eq!(registry.remove_subscription(id), None);
        assert_eq!(registry.route(id), Route::Unknown);
    }

    #[test]
    fn test_unknown_id() {
        let mut registry = Registry::new();
        assert_eq!(registry.route(CorrelationId::new(42)), Route::Unknown);
    }

    #[test]
    fn test_drain_empties_everything() {
        let mut registry = Registry::new();
        let a = registry.allocate();
        let b = registry.allocate();
        registry.insert_pending(a, "call");
        registry.insert_subscription(b, "stream");

        let (pending, subs) = registry.drain();
        assert_eq!(pending, vec![(a, "call")]);
        assert_eq!(subs, vec![(b, "stream")]);
        assert_eq!(registry.pending_len() + registry.subscription_len(), 0);
        assert!(!registry.is_pending(a));
        assert!(!registry.is_subscribed(b));
    }
}
