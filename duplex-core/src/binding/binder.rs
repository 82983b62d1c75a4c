//! Property Binder
//!
//! The binder owns the binding table for a pair of lists and manages the
//! bind/unbind lifecycle. It never changes either list's length or order;
//! it only attaches and detaches property-change handlers.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --bind_all/bind--> Bound --unbind_all--> Unbound
//!   Bound --set_config-----> Bound (unbind all, apply, bind all)
//! ```
//!
//! A failed bind leaves the table either fully unbound or exactly as it was.
//! Each pair is validated (duplicate target, item capabilities, strategy
//! requirements) before any handler is attached.
//!
//! # Handlers
//!
//! Handlers hold weak references to the binder and to both items, so an
//! item never keeps its binder or its counterpart alive. Dropping the
//! binder unbinds everything.
//!
//! # Threads
//!
//! The syncing flag belongs to the binder, not to a thread. A binder driven
//! from several threads at once without an outer lock can suppress a
//! propagation on one thread because another thread is mid-propagation.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::config::BindingConfig;
use super::strategy::{Propagation, PropagationStrategy};
use super::table::{BindingEntry, BindingSlot, BindingTable, ItemKey};
use crate::collection::ObservableList;
use crate::error::{BindError, Result};
use crate::event::{Bindable, Event, PropertyChange};
use crate::sync::SyncFlag;

/// Which side of a pair raised a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

/// Keeps the items of two lists bound pairwise.
pub struct PropertyBinder<S, T>
where
    S: Bindable,
    T: Bindable,
{
    shared: Arc<Shared<S, T>>,
}

struct Shared<S, T> {
    source_list: RwLock<Option<Arc<dyn ObservableList<S>>>>,
    target_list: RwLock<Option<Arc<dyn ObservableList<T>>>>,
    strategy: Arc<dyn PropagationStrategy<S, T>>,
    config: RwLock<BindingConfig>,
    table: Mutex<BindingTable<S, T>>,
    syncing: SyncFlag,
    failures: Event<BindError>,
}

impl<S, T> PropertyBinder<S, T>
where
    S: Bindable,
    T: Bindable,
{
    /// Create a binder over two lists and bind them by index.
    pub fn new<L, R, P>(
        source_list: Arc<L>,
        target_list: Arc<R>,
        strategy: P,
        config: BindingConfig,
    ) -> Result<Self>
    where
        L: ObservableList<S> + 'static,
        R: ObservableList<T> + 'static,
        P: PropagationStrategy<S, T> + 'static,
    {
        let source_list: Arc<dyn ObservableList<S>> = source_list;
        let target_list: Arc<dyn ObservableList<T>> = target_list;
        let binder = Self::detached(strategy, config);
        binder.set_lists(Some(source_list), Some(target_list))?;
        Ok(binder)
    }

    /// Create a binder with no lists. Pairs can still be bound explicitly.
    pub fn detached<P>(strategy: P, config: BindingConfig) -> Self
    where
        P: PropagationStrategy<S, T> + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                source_list: RwLock::new(None),
                target_list: RwLock::new(None),
                strategy: Arc::new(strategy),
                config: RwLock::new(config),
                table: Mutex::new(BindingTable::new()),
                syncing: SyncFlag::new(),
                failures: Event::new(),
            }),
        }
    }

    /// Replace both lists, then rebind by index.
    pub fn set_lists(
        &self,
        source_list: Option<Arc<dyn ObservableList<S>>>,
        target_list: Option<Arc<dyn ObservableList<T>>>,
    ) -> Result<()> {
        self.unbind_all();
        *self.shared.source_list.write() = source_list;
        *self.shared.target_list.write() = target_list;
        self.bind_all()
    }

    /// Bind both lists pairwise by index.
    ///
    /// Does nothing if either list is missing or binding is disabled.
    /// Otherwise every existing binding is removed first, then indices
    /// `0..min(len_source, len_target)` are bound. Items past the shorter
    /// list's length are left unbound.
    pub fn bind_all(&self) -> Result<()> {
        Shared::bind_all(&self.shared)
    }

    /// Bind `source` to `target`.
    ///
    /// Fails with [`BindError::DuplicateBinding`] if `target` is already
    /// bound, and with [`BindError::UnsupportedItem`] if either item lacks a
    /// capability the configuration or strategy needs.
    pub fn bind(&self, source: &Arc<S>, target: &Arc<T>) -> Result<BindingSlot> {
        let config = *self.shared.config.read();
        let mut table = self.shared.table.lock();
        self.shared.check_pair(&table, source, target, &config)?;
        let slot = Shared::attach(&self.shared, &mut table, source, target, &config)?;
        debug!(slot = slot.raw(), strategy = self.shared.strategy.name(), "bound pair");
        Ok(slot)
    }

    /// Unbind `source` from `target`.
    ///
    /// Returns `false` if the two were not bound to each other.
    pub fn unbind(&self, source: &Arc<S>, target: &Arc<T>) -> bool {
        let entry = self.shared.table.lock().remove_pair(source, target);
        match entry {
            Some(entry) => {
                detach(&entry);
                debug!(strategy = self.shared.strategy.name(), "unbound pair");
                true
            }
            None => false,
        }
    }

    /// Unbind every pair. Calling this on an empty table is a no-op.
    pub fn unbind_all(&self) {
        let mut table = self.shared.table.lock();
        self.shared.detach_all(&mut table);
    }

    /// Current configuration.
    pub fn config(&self) -> BindingConfig {
        *self.shared.config.read()
    }

    /// Apply a new configuration: unbind all, apply, bind all if enabled.
    pub fn set_config(&self, config: BindingConfig) -> Result<()> {
        self.unbind_all();
        let previous = std::mem::replace(&mut *self.shared.config.write(), config);
        debug!(?previous, current = ?config, "binding configuration changed");
        if config.enabled {
            self.bind_all()
        } else {
            Ok(())
        }
    }

    /// Whether target changes propagate back to the source.
    pub fn is_bidirectional(&self) -> bool {
        self.config().bidirectional
    }

    /// Change the binding direction.
    pub fn set_bidirectional(&self, bidirectional: bool) -> Result<()> {
        self.set_config(self.config().with_bidirectional(bidirectional))
    }

    /// Whether bindings are attached.
    pub fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    /// Enable or disable binding.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.set_config(self.config().with_enabled(enabled))
    }

    /// Number of bound pairs.
    pub fn binding_count(&self) -> usize {
        self.shared.table.lock().len()
    }

    /// Every bound pair, in bind order.
    pub fn bound_pairs(&self) -> Vec<(Arc<S>, Arc<T>)> {
        self.shared.table.lock().pairs()
    }

    /// The source bound to `target`.
    pub fn source_of(&self, target: &Arc<T>) -> Option<Arc<S>> {
        self.shared.table.lock().source_of(target).cloned()
    }

    /// Whether `target` is bound.
    pub fn is_bound(&self, target: &Arc<T>) -> bool {
        self.shared.table.lock().slot_of_target(target).is_some()
    }

    /// Whether a propagation step is running right now.
    pub fn is_syncing(&self) -> bool {
        self.shared.syncing.is_in_progress()
    }

    /// Name of the active strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.shared.strategy.name()
    }

    /// Raised with the error whenever a propagation fails.
    ///
    /// Propagations run inside property-change handlers, so their errors
    /// have no caller to return to.
    pub fn propagation_failures(&self) -> &Event<BindError> {
        &self.shared.failures
    }
}

impl<S, T> Shared<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn bind_all(this: &Arc<Self>) -> Result<()> {
        let source_list = this.source_list.read().clone();
        let target_list = this.target_list.read().clone();
        let (Some(source_list), Some(target_list)) = (source_list, target_list) else {
            return Ok(());
        };
        let config = *this.config.read();
        if !config.enabled {
            return Ok(());
        }

        let sources = source_list.snapshot();
        let targets = target_list.snapshot();
        if sources.len() != targets.len() {
            debug!(
                sources = sources.len(),
                targets = targets.len(),
                "list lengths differ; binding the common prefix"
            );
        }
        let pairs: Vec<(Arc<S>, Arc<T>)> = sources.into_iter().zip(targets).collect();

        let mut table = this.table.lock();
        this.detach_all(&mut table);

        let mut seen = HashSet::with_capacity(pairs.len());
        for (index, (source, target)) in pairs.iter().enumerate() {
            this.check_pair(&table, source, target, &config)?;
            if !seen.insert(ItemKey::of(target)) {
                return Err(BindError::DuplicateBinding(format!(
                    "target item at index {index} appears earlier in the target list"
                )));
            }
        }

        for (source, target) in &pairs {
            if let Err(err) = Self::attach(this, &mut table, source, target, &config) {
                this.detach_all(&mut table);
                return Err(err);
            }
        }

        debug!(
            pairs = table.len(),
            strategy = this.strategy.name(),
            bidirectional = config.bidirectional,
            "bound all pairs"
        );
        Ok(())
    }

    /// Validate a pair without touching the table or any item.
    fn check_pair(
        &self,
        table: &BindingTable<S, T>,
        source: &Arc<S>,
        target: &Arc<T>,
        config: &BindingConfig,
    ) -> Result<()> {
        table.ensure_unbound(target)?;
        if source.property_changed().is_none() {
            return Err(BindError::UnsupportedItem(
                "source item does not raise property change notifications".to_string(),
            ));
        }
        if config.bidirectional && target.property_changed().is_none() {
            return Err(BindError::UnsupportedItem(
                "bidirectional binding needs a target item that raises property change notifications"
                    .to_string(),
            ));
        }
        self.strategy.check_pair(source, target, config)
    }

    /// Subscribe the pair's handlers and record the entry.
    fn attach(
        this: &Arc<Self>,
        table: &mut BindingTable<S, T>,
        source: &Arc<S>,
        target: &Arc<T>,
        config: &BindingConfig,
    ) -> Result<BindingSlot> {
        let Some(source_event) = source.property_changed() else {
            return Err(BindError::UnsupportedItem(
                "source item does not raise property change notifications".to_string(),
            ));
        };

        let source_handler = source_event.subscribe(Self::handler(this, Side::Source, source, target));
        let target_handler = if config.bidirectional {
            target
                .property_changed()
                .map(|event| event.subscribe(Self::handler(this, Side::Target, source, target)))
        } else {
            None
        };

        let entry = BindingEntry {
            source: Arc::clone(source),
            target: Arc::clone(target),
            source_handler,
            target_handler,
        };
        match table.insert(entry) {
            Ok(slot) => Ok(slot),
            Err(err) => {
                source_event.unsubscribe(source_handler);
                if let (Some(id), Some(event)) = (target_handler, target.property_changed()) {
                    event.unsubscribe(id);
                }
                Err(err)
            }
        }
    }

    fn handler(
        this: &Arc<Self>,
        side: Side,
        source: &Arc<S>,
        target: &Arc<T>,
    ) -> impl Fn(&PropertyChange) + Send + Sync + 'static {
        let shared = Arc::downgrade(this);
        let source = Arc::downgrade(source);
        let target = Arc::downgrade(target);

        move |change: &PropertyChange| {
            let (Some(shared), Some(source), Some(target)) =
                (shared.upgrade(), source.upgrade(), target.upgrade())
            else {
                return;
            };
            shared.propagate(side, &source, &target, change);
        }
    }

    fn propagate(&self, side: Side, source: &Arc<S>, target: &Arc<T>, change: &PropertyChange) {
        if self.syncing.is_in_progress() {
            trace!(?side, property = change.property_name(), "suppressed echo while syncing");
            return;
        }
        let config = *self.config.read();
        if !config.enabled {
            trace!(?side, "binding disabled");
            return;
        }
        if side == Side::Target && !config.bidirectional {
            trace!("target change ignored by one-way binding");
            return;
        }
        let Some(scope) = self.syncing.begin() else {
            return;
        };

        let source_list = self.source_list.read().clone();
        let target_list = self.target_list.read().clone();
        let cx = Propagation {
            source,
            target,
            source_list: source_list.as_deref(),
            target_list: target_list.as_deref(),
            table: &self.table,
        };

        let result = match side {
            Side::Source => self.strategy.on_source_changed(&cx, change),
            Side::Target => self.strategy.on_target_changed(&cx, change),
        };
        drop(scope);

        if let Err(err) = result {
            warn!(
                strategy = self.strategy.name(),
                ?side,
                property = change.property_name(),
                %err,
                "propagation failed"
            );
            self.failures.emit(&err);
        }
    }

    fn detach_all(&self, table: &mut BindingTable<S, T>) {
        let entries = table.drain();
        for entry in &entries {
            detach(entry);
        }
        if !entries.is_empty() {
            debug!(pairs = entries.len(), strategy = self.strategy.name(), "unbound all pairs");
        }
    }
}

/// Remove the handlers a binding entry attached.
fn detach<S, T>(entry: &BindingEntry<S, T>)
where
    S: Bindable,
    T: Bindable,
{
    if let Some(event) = entry.source.property_changed() {
        event.unsubscribe(entry.source_handler);
    }
    if let (Some(id), Some(event)) = (entry.target_handler, entry.target.property_changed()) {
        event.unsubscribe(id);
    }
}

impl<S, T> Drop for PropertyBinder<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn drop(&mut self) {
        self.unbind_all();
    }
}

impl<S, T> Debug for PropertyBinder<S, T>
where
    S: Bindable,
    T: Bindable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinder")
            .field("strategy", &self.strategy_name())
            .field("config", &self.config())
            .field("binding_count", &self.binding_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::fixtures::{models, Model, Silent};
    use crate::collection::NotifyingList;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    /// Records every call without touching either item.
    #[derive(Default)]
    struct Recording {
        source_calls: AtomicUsize,
        target_calls: AtomicUsize,
    }

    impl PropagationStrategy<Model, Model> for Arc<Recording> {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn on_source_changed(&self, _: &Propagation<'_, Model, Model>, _: &PropertyChange) -> Result<()> {
            self.source_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_target_changed(&self, _: &Propagation<'_, Model, Model>, _: &PropertyChange) -> Result<()> {
            self.target_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Always fails.
    struct Failing;

    impl PropagationStrategy<Model, Model> for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn on_source_changed(&self, _: &Propagation<'_, Model, Model>, _: &PropertyChange) -> Result<()> {
            Err(BindError::UnsupportedItem("nothing to propagate to".to_string()))
        }

        fn on_target_changed(&self, _: &Propagation<'_, Model, Model>, _: &PropertyChange) -> Result<()> {
            Ok(())
        }
    }

    fn pair_ids(binder: &PropertyBinder<Model, Model>) -> Vec<(u32, u32)> {
        binder
            .bound_pairs()
            .iter()
            .map(|(s, t)| (s.id(), t.id()))
            .collect()
    }

    #[test]
    fn bind_all_pairs_by_index() {
        let (a, b) = (models(&[1, 2, 3]), models(&[11, 12, 13]));
        let binder = PropertyBinder::new(a, b, Arc::new(Recording::default()), BindingConfig::new()).unwrap();

        assert_eq!(pair_ids(&binder), vec![(1, 11), (2, 12), (3, 13)]);
    }

    #[test]
    fn bind_all_stops_at_shorter_list() {
        let (a, b) = (models(&[1, 2, 3]), models(&[11]));
        let binder = PropertyBinder::new(a, b, Arc::new(Recording::default()), BindingConfig::new()).unwrap();

        assert_eq!(pair_ids(&binder), vec![(1, 11)]);
    }

    #[test]
    fn bind_all_is_noop_without_lists_or_when_disabled() {
        let binder: PropertyBinder<Model, Model> =
            PropertyBinder::detached(Arc::new(Recording::default()), BindingConfig::new());
        binder.bind_all().unwrap();
        assert_eq!(binder.binding_count(), 0);

        let (a, b) = (models(&[1]), models(&[11]));
        let binder = PropertyBinder::new(
            a,
            b,
            Arc::new(Recording::default()),
            BindingConfig::new().with_enabled(false),
        )
        .unwrap();
        assert_eq!(binder.binding_count(), 0);
    }

    #[test]
    fn duplicate_target_is_rejected_and_table_unchanged() {
        let binder: PropertyBinder<Model, Model> =
            PropertyBinder::detached(Arc::new(Recording::default()), BindingConfig::new());
        let (a1, a2, b1) = (Model::new(1), Model::new(2), Model::new(11));

        binder.bind(&a1, &b1).unwrap();
        let err = binder.bind(&a2, &b1).unwrap_err();
        assert!(matches!(err, BindError::DuplicateBinding(_)));
        assert_eq!(binder.binding_count(), 1);
        // No stray handler was left on the rejected source
        assert_eq!(a2.notifier_handlers(), 0);
    }

    #[test]
    fn duplicate_target_in_list_leaves_table_unbound() {
        let shared = Model::new(11);
        let a = models(&[1, 2]);
        let b = Arc::new(NotifyingList::from_items([shared.clone(), shared.clone()]));

        let result = PropertyBinder::new(a.clone(), b, Arc::new(Recording::default()), BindingConfig::new());
        assert!(matches!(result, Err(BindError::DuplicateBinding(_))));
        assert_eq!(shared.notifier_handlers(), 0);
        assert_eq!(a.get(0).unwrap().notifier_handlers(), 0);
    }

    #[test]
    fn one_way_subscribes_only_to_source() {
        let binder: PropertyBinder<Model, Model> =
            PropertyBinder::detached(Arc::new(Recording::default()), BindingConfig::new());
        let (a, b) = (Model::new(1), Model::new(11));

        binder.bind(&a, &b).unwrap();
        assert_eq!(a.notifier_handlers(), 1);
        assert_eq!(b.notifier_handlers(), 0);

        binder.set_bidirectional(true).unwrap();
        // Explicit pairs are dropped by a reconfiguration of a detached binder
        assert_eq!(binder.binding_count(), 0);
        binder.bind(&a, &b).unwrap();
        assert_eq!(b.notifier_handlers(), 1);
    }

    #[test]
    fn bidirectional_needs_notifying_target() {
        let binder: PropertyBinder<Model, Silent> = PropertyBinder::detached(
            crate::binding::CustomMap::new(crate::binding::FnPropertyMap::new()),
            BindingConfig::new().with_bidirectional(true),
        );
        let (a, b) = (Model::new(1), Arc::new(Silent));

        let err = binder.bind(&a, &b).unwrap_err();
        assert!(matches!(err, BindError::UnsupportedItem(_)));
        assert_eq!(a.notifier_handlers(), 0);
        assert_eq!(binder.binding_count(), 0);

        binder.set_bidirectional(false).unwrap();
        binder.bind(&a, &b).unwrap();
    }

    #[test]
    fn unbind_all_is_idempotent() {
        let (a, b) = (models(&[1, 2]), models(&[11, 12]));
        let binder = PropertyBinder::new(a.clone(), b, Arc::new(Recording::default()), BindingConfig::new()).unwrap();

        binder.unbind_all();
        assert_eq!(binder.binding_count(), 0);
        binder.unbind_all();
        assert_eq!(binder.binding_count(), 0);
        assert_eq!(a.get(0).unwrap().notifier_handlers(), 0);
    }

    #[test]
    fn unbind_single_pair() {
        let binder: PropertyBinder<Model, Model> =
            PropertyBinder::detached(Arc::new(Recording::default()), BindingConfig::new());
        let (a1, a2, b1) = (Model::new(1), Model::new(2), Model::new(11));
        binder.bind(&a1, &b1).unwrap();

        assert!(!binder.unbind(&a2, &b1));
        assert!(binder.unbind(&a1, &b1));
        assert!(!binder.is_bound(&b1));
        assert_eq!(a1.notifier_handlers(), 0);
    }

    #[test]
    fn target_changes_ignored_when_one_way() {
        let recording = Arc::new(Recording::default());
        let (a, b) = (models(&[1]), models(&[11]));
        let binder = PropertyBinder::new(a.clone(), b.clone(), recording.clone(), BindingConfig::new()).unwrap();

        b.get(0).unwrap().set_num1(5);
        assert_eq!(recording.target_calls.load(Ordering::SeqCst), 0);

        a.get(0).unwrap().set_num1(5);
        assert_eq!(recording.source_calls.load(Ordering::SeqCst), 1);

        binder.set_enabled(false).unwrap();
        a.get(0).unwrap().set_num1(6);
        assert_eq!(recording.source_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rebind_restores_same_pairs() {
        let (a, b) = (models(&[1, 2, 3]), models(&[11, 12, 13]));
        let binder = PropertyBinder::new(a, b, Arc::new(Recording::default()), BindingConfig::new()).unwrap();
        let before = pair_ids(&binder);

        binder.set_bidirectional(true).unwrap();
        binder.set_bidirectional(false).unwrap();

        assert_eq!(pair_ids(&binder), before);
    }

    #[test]
    fn dropping_binder_detaches_handlers() {
        let (a, b) = (models(&[1]), models(&[11]));
        let binder = PropertyBinder::new(
            a.clone(),
            b.clone(),
            Arc::new(Recording::default()),
            BindingConfig::new().with_bidirectional(true),
        )
        .unwrap();
        assert_eq!(a.get(0).unwrap().notifier_handlers(), 1);

        drop(binder);
        assert_eq!(a.get(0).unwrap().notifier_handlers(), 0);
        assert_eq!(b.get(0).unwrap().notifier_handlers(), 0);
    }

    #[test]
    #[traced_test]
    fn failed_propagation_is_reported() {
        let (a, b) = (models(&[1]), models(&[11]));
        let binder = PropertyBinder::new(a.clone(), b, Failing, BindingConfig::new()).unwrap();
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();
        binder.propagation_failures().subscribe(move |err: &BindError| {
            assert!(matches!(err, BindError::UnsupportedItem(_)));
            failures_clone.fetch_add(1, Ordering::SeqCst);
        });

        a.get(0).unwrap().set_num1(1);

        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(!binder.is_syncing());
        assert!(logs_contain("propagation failed"));
    }
}
