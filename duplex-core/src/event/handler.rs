//! Handler lists for multicast events.
//!
//! An [`Event`] is an ordered list of callbacks. Each subscription gets a
//! [`HandlerId`], and unsubscribing removes by that id, never by comparing
//! closures.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Unique identifier for a subscribed handler.
///
/// Ids are unique across all events in the process, so a stale id can never
/// remove another subscriber's handler from a different event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Generate a new unique handler ID.
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A multicast event carrying arguments of type `A`.
///
/// Handlers run in subscription order. [`emit`](Self::emit) takes a snapshot
/// of the handler list first and calls the handlers with no lock held, so a
/// handler may subscribe or unsubscribe during emission. Such changes apply
/// from the next emission on.
pub struct Event<A> {
    handlers: RwLock<SmallVec<[(HandlerId, Callback<A>); 2]>>,
}

impl<A> Event<A> {
    /// Create an event with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(SmallVec::new()),
        }
    }

    /// Register a handler and return its id.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = HandlerId::next();
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Remove the handler with the given id.
    ///
    /// Returns `false` if no such handler was subscribed.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Whether a handler with the given id is subscribed.
    pub fn is_subscribed(&self, id: HandlerId) -> bool {
        self.handlers.read().iter().any(|(handler_id, _)| *handler_id == id)
    }

    /// Invoke every handler with `args`.
    pub fn emit(&self, args: &A) {
        let snapshot: SmallVec<[Callback<A>; 2]> = self
            .handlers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(args);
        }
    }

    /// Number of subscribed handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}
