//! Typed event dispatch with collected listener results.
//!
//! [`EventTarget`] is the observable used for every consumer-visible event
//! stream in this crate: page lifecycle (`onLoading`, `onActivated`,
//! `onRemoved`), request decisions (`onBeforeRequest`), messages and storage
//! changes. Dispatch is synchronous fan-out in listener-registration order,
//! and every listener's return value is collected into a `Vec` so callers
//! can implement veto or reply logic over the results.
//!
//! # Example
//!
//! ```
//! use webext_shim::events::EventTarget;
//!
//! let target: EventTarget<u32, bool> = EventTarget::new();
//! let id = target.add_listener(|n| *n > 10);
//!
//! assert_eq!(target.dispatch(&42), vec![true]);
//! assert!(target.remove_listener(id));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

// ============================================================================
// ListenerId
// ============================================================================

/// Handle returned by [`EventTarget::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ============================================================================
// EventTarget
// ============================================================================

type Listener<A, R> = Arc<dyn Fn(&A) -> R + Send + Sync>;

/// An event stream with typed arguments and collected results.
///
/// `A` is the event payload, `R` the listener return type (defaults to
/// `()` for pure notification streams).
pub struct EventTarget<A, R = ()> {
    listeners: RwLock<Vec<(ListenerId, Listener<A, R>)>>,
    next_id: AtomicU64,
}

impl<A, R> fmt::Debug for EventTarget<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTarget")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<A, R> Default for EventTarget<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> EventTarget<A, R> {
    /// Creates an event target with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a listener and returns its handle.
    ///
    /// Listeners are invoked in registration order.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener by handle.
    ///
    /// Returns `true` if the listener was registered. Removing twice is a
    /// no-op, so a one-shot listener cannot leak.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Checks whether a listener handle is currently registered.
    #[must_use]
    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .read()
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Checks whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Dispatches an event to all listeners, collecting results in
    /// registration order.
    ///
    /// Listeners registered or removed by a running listener take effect
    /// on the next dispatch; the current fan-out uses a snapshot.
    pub fn dispatch(&self, args: &A) -> Vec<R> {
        let snapshot: Vec<Listener<A, R>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        snapshot.iter().map(|listener| listener(args)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
