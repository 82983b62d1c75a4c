//! Propagation strategies.
//!
//! A strategy decides what a property change on one side of a bound pair
//! does to the other side. The binder calls a strategy only after its
//! shared guards have passed:
//!
//! 1. the binder's syncing flag is not already set (no feedback loops)
//! 2. binding is enabled
//! 3. for target-side changes, the binding is bidirectional
//!
//! and it holds the syncing flag for the whole call. Strategies therefore
//! only implement the propagation itself.

use std::sync::Arc;

use parking_lot::Mutex;

use super::config::BindingConfig;
use super::table::BindingTable;
use crate::collection::ObservableList;
use crate::error::Result;
use crate::event::PropertyChange;

/// Policy for reflecting a change on the counterpart item.
pub trait PropagationStrategy<S, T>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check, before anything is attached, that `source` and `target` can be
    /// bound under `config`.
    fn check_pair(&self, source: &S, target: &T, config: &BindingConfig) -> Result<()> {
        let _ = (source, target, config);
        Ok(())
    }

    /// A property of the source item changed.
    fn on_source_changed(&self, cx: &Propagation<'_, S, T>, change: &PropertyChange) -> Result<()>;

    /// A property of the target item changed.
    fn on_target_changed(&self, cx: &Propagation<'_, S, T>, change: &PropertyChange) -> Result<()>;
}

/// Everything a strategy can see while handling one change.
pub struct Propagation<'a, S, T> {
    pub(crate) source: &'a Arc<S>,
    pub(crate) target: &'a Arc<T>,
    pub(crate) source_list: Option<&'a dyn ObservableList<S>>,
    pub(crate) target_list: Option<&'a dyn ObservableList<T>>,
    pub(crate) table: &'a Mutex<BindingTable<S, T>>,
}

impl<'a, S, T> Propagation<'a, S, T> {
    /// The source item of the pair whose handler fired.
    pub fn source(&self) -> &'a Arc<S> {
        self.source
    }

    /// The target item of the pair whose handler fired.
    pub fn target(&self) -> &'a Arc<T> {
        self.target
    }

    /// The binder's source list, if it has one.
    pub fn source_list(&self) -> Option<&'a dyn ObservableList<S>> {
        self.source_list
    }

    /// The binder's target list, if it has one.
    pub fn target_list(&self) -> Option<&'a dyn ObservableList<T>> {
        self.target_list
    }

    /// The source currently bound to `target`.
    pub fn bound_source_of(&self, target: &Arc<T>) -> Option<Arc<S>> {
        self.table.lock().source_of(target).cloned()
    }

    /// Whether `target` is currently bound to `source`.
    pub fn is_bound_to(&self, source: &Arc<S>, target: &Arc<T>) -> bool {
        self.bound_source_of(target)
            .is_some_and(|bound| Arc::ptr_eq(&bound, source))
    }
}
