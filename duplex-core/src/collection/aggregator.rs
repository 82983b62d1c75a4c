//! Change-notification aggregator.
//!
//! Turns the structural primitives (reset, add, add-many, remove, move,
//! replace) into event emissions. Every primitive fires on two channels: the
//! generic "any change" channel and the channel for its own kind. Each
//! channel has a before-change and an after-change event.
//!
//! # Emission Order
//!
//! For one primitive the order is fixed:
//!
//! 1. generic before, then specific before
//! 2. the mutation itself
//! 3. generic after, then specific after
//!
//! # Reentrancy
//!
//! Emissions run inside a block on a counting [`ReentrancyMonitor`]. A
//! mutation requested while a block is active (a handler mutating the
//! collection it is being notified about) is rejected if the generic
//! after-change event has more than one subscriber, since the other
//! subscribers would observe the changes out of order. With a single
//! subscriber the nested mutation is allowed.

use std::fmt::{self, Debug};
use std::sync::Arc;

use tracing::warn;

use super::change::{ChangeKind, CollectionChange};
use crate::error::{BindError, Result};
use crate::event::Event;
use crate::sync::ReentrancyMonitor;

/// Before/after phase of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

/// A pair of before/after events.
pub struct Channel<T> {
    before: Event<CollectionChange<T>>,
    after: Event<CollectionChange<T>>,
}

impl<T> Channel<T> {
    fn new() -> Self {
        Self {
            before: Event::new(),
            after: Event::new(),
        }
    }

    /// Event raised before the collection is mutated.
    pub fn before(&self) -> &Event<CollectionChange<T>> {
        &self.before
    }

    /// Event raised after the collection was mutated.
    pub fn after(&self) -> &Event<CollectionChange<T>> {
        &self.after
    }

    /// The event for `phase`.
    pub fn phase(&self, phase: Phase) -> &Event<CollectionChange<T>> {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }
}

/// Collects structural primitives into before/after change events.
pub struct ChangeAggregator<T> {
    any: Channel<T>,
    added: Channel<T>,
    removed: Channel<T>,
    moved: Channel<T>,
    replaced: Channel<T>,
    reset: Channel<T>,
    block: ReentrancyMonitor,
}

impl<T> ChangeAggregator<T> {
    /// Create an aggregator with no subscribers.
    pub fn new() -> Self {
        Self {
            any: Channel::new(),
            added: Channel::new(),
            removed: Channel::new(),
            moved: Channel::new(),
            replaced: Channel::new(),
            reset: Channel::new(),
            block: ReentrancyMonitor::allowing_reentrancy(),
        }
    }

    /// The generic channel, raised for every change.
    pub fn any(&self) -> &Channel<T> {
        &self.any
    }

    /// The channel specific to `kind`.
    pub fn on(&self, kind: ChangeKind) -> &Channel<T> {
        match kind {
            ChangeKind::Add => &self.added,
            ChangeKind::Remove => &self.removed,
            ChangeKind::Move => &self.moved,
            ChangeKind::Replace => &self.replaced,
            ChangeKind::Reset => &self.reset,
        }
    }

    /// Whether an emission is in progress.
    pub fn is_notifying(&self) -> bool {
        self.block.is_busy()
    }

    /// Fail if a mutation now would be an unsafe reentrant one.
    pub fn check_reentrancy(&self) -> Result<()> {
        if self.block.is_busy() && self.any.after.handler_count() > 1 {
            warn!(
                depth = self.block.depth(),
                subscribers = self.any.after.handler_count(),
                "rejected collection mutation during change notification"
            );
            return Err(BindError::Reentrancy(
                "collection mutated while its change notification was being delivered"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Emit `change` on the generic and specific events for `phase`.
    pub fn notify(&self, phase: Phase, change: &CollectionChange<T>) -> Result<()> {
        let _block = self.block.enter()?;
        self.any.phase(phase).emit(change);
        self.on(change.kind()).phase(phase).emit(change);
        Ok(())
    }

    /// Run `mutate` wrapped in the before and after notifications for
    /// `change`.
    ///
    /// Nothing is emitted and `mutate` is not called if the reentrancy check
    /// fails.
    pub fn apply<R>(&self, change: CollectionChange<T>, mutate: impl FnOnce() -> R) -> Result<R> {
        self.check_reentrancy()?;
        self.notify(Phase::Before, &change)?;
        let output = mutate();
        self.notify(Phase::After, &change)?;
        Ok(output)
    }

    /// Reset to `items`.
    pub fn reset<R>(&self, items: Vec<Arc<T>>, mutate: impl FnOnce() -> R) -> Result<R> {
        self.apply(CollectionChange::Reset { items }, mutate)
    }

    /// Add `item` at `index`.
    pub fn add<R>(&self, item: Arc<T>, index: usize, mutate: impl FnOnce() -> R) -> Result<R> {
        self.add_many(vec![item], index, mutate)
    }

    /// Add `items` contiguously starting at `index`.
    pub fn add_many<R>(
        &self,
        items: Vec<Arc<T>>,
        index: usize,
        mutate: impl FnOnce() -> R,
    ) -> Result<R> {
        self.apply(CollectionChange::Add { items, index }, mutate)
    }

    /// Remove `item` from `index`.
    pub fn remove<R>(&self, item: Arc<T>, index: usize, mutate: impl FnOnce() -> R) -> Result<R> {
        self.apply(CollectionChange::Remove { item, index }, mutate)
    }

    /// Move `item` from `old_index` to `index`.
    pub fn move_item<R>(
        &self,
        item: Arc<T>,
        index: usize,
        old_index: usize,
        mutate: impl FnOnce() -> R,
    ) -> Result<R> {
        self.apply(
            CollectionChange::Move {
                item,
                index,
                old_index,
            },
            mutate,
        )
    }

    /// Replace `old_item` with `new_item` at `index`.
    pub fn replace<R>(
        &self,
        old_item: Arc<T>,
        new_item: Arc<T>,
        index: usize,
        mutate: impl FnOnce() -> R,
    ) -> Result<R> {
        self.apply(
            CollectionChange::Replace {
                old_item,
                new_item,
                index,
            },
            mutate,
        )
    }
}

impl<T> Default for ChangeAggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for ChangeAggregator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeAggregator")
            .field("subscribers", &self.any.after.handler_count())
            .field("notifying", &self.is_notifying())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn record(
        aggregator: &ChangeAggregator<i32>,
        log: &Arc<Mutex<Vec<String>>>,
    ) {
        for (label, channel) in [
            ("any", aggregator.any()),
            ("add", aggregator.on(ChangeKind::Add)),
            ("remove", aggregator.on(ChangeKind::Remove)),
        ] {
            for phase in [Phase::Before, Phase::After] {
                let log = log.clone();
                channel.phase(phase).subscribe(move |change| {
                    log.lock().push(format!("{label}:{phase:?}:{:?}", change.kind()));
                });
            }
        }
    }

    #[test]
    fn emission_order_is_generic_then_specific() {
        let aggregator = ChangeAggregator::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        record(&aggregator, &log);

        let mutated = aggregator
            .add(Arc::new(1), 0, || {
                log.lock().push("mutate".to_string());
                true
            })
            .unwrap();
        assert!(mutated);

        assert_eq!(
            *log.lock(),
            vec![
                "any:Before:Add",
                "add:Before:Add",
                "mutate",
                "any:After:Add",
                "add:After:Add",
            ]
        );
    }

    #[test]
    fn specific_channel_only_fires_for_its_kind() {
        let aggregator = ChangeAggregator::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        record(&aggregator, &log);

        aggregator.remove(Arc::new(1), 0, || ()).unwrap();
        aggregator.reset(vec![], || ()).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "any:Before:Remove",
                "remove:Before:Remove",
                "any:After:Remove",
                "remove:After:Remove",
                "any:Before:Reset",
                "any:After:Reset",
            ]
        );
    }

    #[test]
    fn reentrant_mutation_with_several_subscribers_is_rejected() {
        let aggregator = Arc::new(ChangeAggregator::<i32>::new());
        let items = Arc::new(Mutex::new(Vec::<i32>::new()));
        let nested = Arc::new(Mutex::new(None));

        {
            let weak = Arc::downgrade(&aggregator);
            let items = items.clone();
            let nested = nested.clone();
            aggregator.any().after().subscribe(move |change| {
                if change.index() != Some(0) {
                    return;
                }
                if let Some(aggregator) = weak.upgrade() {
                    let result = aggregator.add(Arc::new(2), 1, || items.lock().push(2));
                    *nested.lock() = Some(result);
                }
            });
        }
        aggregator.any().after().subscribe(|_| {});

        aggregator
            .add(Arc::new(1), 0, || items.lock().push(1))
            .unwrap();

        assert!(matches!(
            nested.lock().take(),
            Some(Err(BindError::Reentrancy(_)))
        ));
        // The rejected mutation never ran
        assert_eq!(*items.lock(), vec![1]);
        assert!(!aggregator.is_notifying());
    }

    #[test]
    fn reentrant_mutation_with_single_subscriber_is_allowed() {
        let aggregator = Arc::new(ChangeAggregator::<i32>::new());
        let items = Arc::new(Mutex::new(Vec::<i32>::new()));

        {
            let weak = Arc::downgrade(&aggregator);
            let items = items.clone();
            aggregator.any().after().subscribe(move |change| {
                if change.index() != Some(0) {
                    return;
                }
                if let Some(aggregator) = weak.upgrade() {
                    aggregator
                        .add(Arc::new(2), 1, || items.lock().push(2))
                        .unwrap();
                }
            });
        }

        aggregator
            .add(Arc::new(1), 0, || items.lock().push(1))
            .unwrap();

        assert_eq!(*items.lock(), vec![1, 2]);
    }
}
