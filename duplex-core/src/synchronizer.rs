//! List synchronizer.
//!
//! Keeps a target list structurally in step with a source list. Every
//! structural change on the source is mirrored onto the target through a
//! converter, and the [`PropertyBinder`] is told which pairs appeared and
//! disappeared:
//!
//! | Source change | Target list        | Binder            |
//! |---------------|--------------------|-------------------|
//! | Add           | insert converted   | bind new pairs    |
//! | Remove        | remove same index  | unbind the pair   |
//! | Move          | move same indices  | (unchanged)       |
//! | Replace       | set converted      | rebind the pair   |
//! | Reset         | reset converted    | bind all          |
//!
//! A replace of an item with itself is an index refresh and is not
//! mirrored. With a reverse converter, target changes are mirrored back
//! onto the source the same way. A mirrored change never bounces back: the
//! synchronizer holds its own syncing flag while it mirrors.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use crate::binding::PropertyBinder;
use crate::collection::{ChangeKind, CollectionChange, ObservableList};
use crate::error::{BindError, Result};
use crate::event::{Bindable, Event, HandlerId};
use crate::sync::SyncFlag;

type Convert<A, B> = Box<dyn Fn(&Arc<A>) -> Arc<B> + Send + Sync>;

/// Item converters for a [`ListSynchronizer`].
pub struct Converters<S, T> {
    to_target: Convert<S, T>,
    to_source: Option<Convert<T, S>>,
}

impl<S, T> Converters<S, T> {
    /// Mirror source changes onto the target only.
    pub fn one_way<F>(to_target: F) -> Self
    where
        F: Fn(&Arc<S>) -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            to_target: Box::new(to_target),
            to_source: None,
        }
    }

    /// Mirror changes in both directions.
    pub fn two_way<F, G>(to_target: F, to_source: G) -> Self
    where
        F: Fn(&Arc<S>) -> Arc<T> + Send + Sync + 'static,
        G: Fn(&Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            to_target: Box::new(to_target),
            to_source: Some(Box::new(to_source)),
        }
    }

    pub fn is_two_way(&self) -> bool {
        self.to_source.is_some()
    }
}

/// Mirrors structural changes between two lists and keeps a binder in step.
pub struct ListSynchronizer<S, T>
where
    S: Bindable,
    T: Bindable,
{
    shared: Arc<Shared<S, T>>,
    source_handler: HandlerId,
    target_handler: Option<HandlerId>,
}

struct Shared<S, T>
where
    S: Bindable,
    T: Bindable,
{
    source: Arc<dyn ObservableList<S>>,
    target: Arc<dyn ObservableList<T>>,
    converters: Converters<S, T>,
    binder: PropertyBinder<S, T>,
    syncing: SyncFlag,
    failures: Event<BindError>,
}

impl<S, T> ListSynchronizer<S, T>
where
    S: Bindable,
    T: Bindable,
{
    /// Reset `target` to the converted contents of `source`, bind every
    /// pair, then start mirroring.
    ///
    /// `binder` is pointed at the two lists; any lists it had before are
    /// replaced.
    pub fn new<L, R>(
        source: Arc<L>,
        target: Arc<R>,
        converters: Converters<S, T>,
        binder: PropertyBinder<S, T>,
    ) -> Result<Self>
    where
        L: ObservableList<S> + 'static,
        R: ObservableList<T> + 'static,
    {
        let source: Arc<dyn ObservableList<S>> = source;
        let target: Arc<dyn ObservableList<T>> = target;
        let two_way = converters.is_two_way();
        let shared = Arc::new(Shared {
            source,
            target,
            converters,
            binder,
            syncing: SyncFlag::new(),
            failures: Event::new(),
        });

        shared.resync()?;

        let weak = Arc::downgrade(&shared);
        let source_handler = shared
            .source
            .changes()
            .any()
            .after()
            .subscribe(move |change: &CollectionChange<S>| {
                if let Some(shared) = Weak::upgrade(&weak) {
                    shared.on_source_change(change);
                }
            });

        let target_handler = two_way.then(|| {
            let weak = Arc::downgrade(&shared);
            shared
                .target
                .changes()
                .any()
                .after()
                .subscribe(move |change: &CollectionChange<T>| {
                    if let Some(shared) = Weak::upgrade(&weak) {
                        shared.on_target_change(change);
                    }
                })
        });

        debug!(
            items = shared.source.len(),
            two_way,
            strategy = shared.binder.strategy_name(),
            "list synchronizer started"
        );
        Ok(Self {
            shared,
            source_handler,
            target_handler,
        })
    }

    /// Rebuild the target from the source and rebind every pair.
    pub fn resync(&self) -> Result<()> {
        let Some(_scope) = self.shared.syncing.begin() else {
            return Err(BindError::Reentrancy(
                "resync requested while a change was being mirrored".to_string(),
            ));
        };
        self.shared.resync()
    }

    /// The binder keeping the pairs' properties in step.
    pub fn binder(&self) -> &PropertyBinder<S, T> {
        &self.shared.binder
    }

    /// Raised with the error whenever mirroring a change fails.
    pub fn failures(&self) -> &Event<BindError> {
        &self.shared.failures
    }

    pub fn is_two_way(&self) -> bool {
        self.target_handler.is_some()
    }
}

impl<S, T> Shared<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn resync(&self) -> Result<()> {
        let items = self
            .source
            .snapshot()
            .iter()
            .map(|item| (self.converters.to_target)(item))
            .collect();
        self.target.reset(items)?;
        self.binder
            .set_lists(Some(self.source.clone()), Some(self.target.clone()))
    }

    fn on_source_change(&self, change: &CollectionChange<S>) {
        if change.is_refresh() {
            return;
        }
        let Some(scope) = self.syncing.begin() else {
            trace!(kind = ?change.kind(), "mirrored change not echoed to target");
            return;
        };
        let result = self.mirror_to_target(change);
        drop(scope);
        self.report(result, change.kind(), "source");
    }

    fn on_target_change(&self, change: &CollectionChange<T>) {
        if change.is_refresh() {
            return;
        }
        let Some(scope) = self.syncing.begin() else {
            trace!(kind = ?change.kind(), "mirrored change not echoed to source");
            return;
        };
        let result = self.mirror_to_source(change);
        drop(scope);
        self.report(result, change.kind(), "target");
    }

    fn report(&self, result: Result<()>, kind: ChangeKind, from: &'static str) {
        match result {
            Ok(()) => debug!(?kind, from, "mirrored structural change"),
            Err(err) => {
                warn!(?kind, from, %err, "failed to mirror structural change");
                self.failures.emit(&err);
            }
        }
    }

    /// Bind each added pair. The whole batch is already in both lists, so a
    /// pair that fails to bind stays unbound and the rest are still bound.
    /// The first failure is returned.
    fn bind_added<'a>(&self, pairs: impl Iterator<Item = (&'a Arc<S>, &'a Arc<T>)>) -> Result<()> {
        let mut first = None;
        for (source, target) in pairs {
            if let Err(err) = self.binder.bind(source, target) {
                match first {
                    None => first = Some(err),
                    Some(_) => warn!(%err, "added pair left unbound"),
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn mirror_to_target(&self, change: &CollectionChange<S>) -> Result<()> {
        let bind = self.binder.is_enabled();
        match change {
            CollectionChange::Add { items, index } => {
                let converted: Vec<_> = items.iter().map(|item| (self.converters.to_target)(item)).collect();
                for (offset, item) in converted.iter().enumerate() {
                    self.target.insert(index + offset, item.clone())?;
                }
                if !bind {
                    return Ok(());
                }
                self.bind_added(items.iter().zip(&converted))
            }
            CollectionChange::Remove { item, index } => {
                let removed = self.target.remove_at(*index)?;
                self.binder.unbind(item, &removed);
                Ok(())
            }
            CollectionChange::Move { index, old_index, .. } => self.target.move_item(*old_index, *index),
            CollectionChange::Replace {
                old_item,
                new_item,
                index,
            } => {
                let converted = (self.converters.to_target)(new_item);
                let replaced = self.target.set(*index, converted.clone())?;
                self.binder.unbind(old_item, &replaced);
                if bind {
                    self.binder.bind(new_item, &converted)?;
                }
                Ok(())
            }
            CollectionChange::Reset { items } => {
                let converted = items
                    .iter()
                    .map(|item| (self.converters.to_target)(item))
                    .collect();
                self.target.reset(converted)?;
                self.binder.bind_all()
            }
        }
    }

    fn mirror_to_source(&self, change: &CollectionChange<T>) -> Result<()> {
        let Some(to_source) = &self.converters.to_source else {
            return Ok(());
        };
        let bind = self.binder.is_enabled();
        match change {
            CollectionChange::Add { items, index } => {
                let converted: Vec<_> = items.iter().map(|item| to_source(item)).collect();
                for (offset, item) in converted.iter().enumerate() {
                    self.source.insert(index + offset, item.clone())?;
                }
                if !bind {
                    return Ok(());
                }
                self.bind_added(converted.iter().zip(items))
            }
            CollectionChange::Remove { item, index } => {
                let removed = self.source.remove_at(*index)?;
                self.binder.unbind(&removed, item);
                Ok(())
            }
            CollectionChange::Move { index, old_index, .. } => self.source.move_item(*old_index, *index),
            CollectionChange::Replace {
                old_item,
                new_item,
                index,
            } => {
                let converted = to_source(new_item);
                let replaced = self.source.set(*index, converted.clone())?;
                self.binder.unbind(&replaced, old_item);
                if bind {
                    self.binder.bind(&converted, new_item)?;
                }
                Ok(())
            }
            CollectionChange::Reset { items } => {
                let converted = items.iter().map(|item| to_source(item)).collect();
                self.source.reset(converted)?;
                self.binder.bind_all()
            }
        }
    }
}

impl<S, T> Drop for ListSynchronizer<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn drop(&mut self) {
        self.shared.source.changes().any().after().unsubscribe(self.source_handler);
        if let Some(id) = self.target_handler {
            self.shared.target.changes().any().after().unsubscribe(id);
        }
    }
}

impl<S, T> Debug for ListSynchronizer<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSynchronizer")
            .field("two_way", &self.is_two_way())
            .field("binder", &self.shared.binder)
            .finish()
    }
}
