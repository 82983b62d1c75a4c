//! Refresh-by-index strategy.
//!
//! A change on an item does not touch its counterpart. Instead the
//! counterpart list signals that the contents at the matching index
//! changed, via [`ObservableList::refresh_at`].
//!
//! Source lists may hold the same item at several indices, so a source
//! change scans the whole source list and refreshes every matching target
//! index. Target lists are duplicate-free, so a target change refreshes a
//! single source index.
//!
//! A bound item that is no longer at a paired index in its list fails the
//! propagation with [`BindError::DuplicateBinding`].

use std::sync::Arc;

use smallvec::SmallVec;

use super::strategy::{Propagation, PropagationStrategy};
use crate::error::{BindError, Result};
use crate::event::{Bindable, PropertyChange};

/// Signals an index refresh on the counterpart list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshByIndex;

impl RefreshByIndex {
    pub fn new() -> Self {
        Self
    }
}

fn missing_lists() -> BindError {
    BindError::UnsupportedItem("refresh by index needs both a source and a target list".to_string())
}

fn mismatch(index: usize) -> BindError {
    BindError::DuplicateBinding(format!(
        "index {index} does not hold the bound counterpart of the changed item"
    ))
}

fn not_listed(side: &str) -> BindError {
    BindError::DuplicateBinding(format!(
        "changed {side} item is bound but no longer at a paired index in its list"
    ))
}

impl<S, T> PropagationStrategy<S, T> for RefreshByIndex
where
    S: Bindable,
    T: Bindable,
{
    fn name(&self) -> &'static str {
        "refresh-by-index"
    }

    fn on_source_changed(&self, cx: &Propagation<'_, S, T>, _change: &PropertyChange) -> Result<()> {
        let (Some(sources), Some(targets)) = (cx.source_list(), cx.target_list()) else {
            return Err(missing_lists());
        };

        // Validate every index before signalling any of them
        let target_len = targets.len();
        let mut indices: SmallVec<[usize; 4]> = SmallVec::new();
        let mut lead = None;
        for (index, item) in sources.snapshot().iter().enumerate() {
            if !Arc::ptr_eq(item, cx.source()) || index >= target_len {
                continue;
            }
            let target = targets.get(index).ok_or_else(|| mismatch(index))?;
            if !cx.is_bound_to(cx.source(), &target) {
                return Err(mismatch(index));
            }
            lead.get_or_insert(target);
            indices.push(index);
        }

        let Some(lead) = lead else {
            return Err(not_listed("source"));
        };
        // Every pair sharing this source fires; the lowest index signals for all
        if !Arc::ptr_eq(&lead, cx.target()) {
            return Ok(());
        }
        for index in indices {
            targets.refresh_at(index)?;
        }
        Ok(())
    }

    fn on_target_changed(&self, cx: &Propagation<'_, S, T>, _change: &PropertyChange) -> Result<()> {
        let (Some(sources), Some(targets)) = (cx.source_list(), cx.target_list()) else {
            return Err(missing_lists());
        };

        let Some(index) = targets.index_of(cx.target()) else {
            return Err(not_listed("target"));
        };
        let source = sources.get(index).ok_or_else(|| mismatch(index))?;
        if !Arc::ptr_eq(&source, cx.source()) || !cx.is_bound_to(&source, cx.target()) {
            return Err(mismatch(index));
        }
        sources.refresh_at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::fixtures::{models, Model};
    use crate::binding::{BindingConfig, PropertyBinder};
    use crate::collection::{ChangeKind, NotifyingList, ObservableList};
    use parking_lot::Mutex;

    fn record_refreshes(list: &NotifyingList<Model>) -> Arc<Mutex<Vec<usize>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        list.changes()
            .on(ChangeKind::Replace)
            .after()
            .subscribe(move |change| {
                if change.is_refresh() {
                    sink.lock().extend(change.index());
                }
            });
        seen
    }

    #[test]
    fn source_change_refreshes_matching_index_only() {
        let (a, b) = (models(&[1, 2, 3]), models(&[11, 12, 13]));
        let binder = PropertyBinder::new(
            a.clone(),
            b.clone(),
            RefreshByIndex,
            BindingConfig::new().with_bidirectional(true),
        )
        .unwrap();
        let refreshed = record_refreshes(&b);

        a.get(1).unwrap().set_num1(7);

        assert_eq!(*refreshed.lock(), vec![1]);
        assert_eq!(binder.binding_count(), 3);
    }

    #[test]
    fn repeated_source_item_refreshes_every_index() {
        let a1 = Model::new(1);
        let a = Arc::new(NotifyingList::from_items([a1.clone(), Model::new(2), a1.clone()]));
        let b = models(&[11, 12, 13]);
        let binder = PropertyBinder::new(a, b.clone(), RefreshByIndex, BindingConfig::new()).unwrap();
        assert_eq!(binder.binding_count(), 3);
        let refreshed = record_refreshes(&b);

        a1.set_num1(3);

        assert_eq!(*refreshed.lock(), vec![0, 2]);
    }

    #[test]
    fn target_change_refreshes_source_index() {
        let (a, b) = (models(&[1, 2, 3]), models(&[11, 12, 13]));
        let _binder = PropertyBinder::new(
            a.clone(),
            b.clone(),
            RefreshByIndex,
            BindingConfig::new().with_bidirectional(true),
        )
        .unwrap();
        let source_refreshes = record_refreshes(&a);
        let target_refreshes = record_refreshes(&b);

        b.get(2).unwrap().set_num1(1);

        assert_eq!(*source_refreshes.lock(), vec![2]);
        // The refresh on list A is not echoed back onto list B
        assert!(target_refreshes.lock().is_empty());
    }

    #[test]
    fn index_mismatch_is_reported_without_refreshing() {
        let (a, b) = (models(&[1, 2]), models(&[11, 12]));
        let binder = PropertyBinder::new(a.clone(), b.clone(), RefreshByIndex, BindingConfig::new()).unwrap();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        binder
            .propagation_failures()
            .subscribe(move |err: &BindError| sink.lock().push(err.clone()));

        // Reorder B behind the binder's back
        b.move_item(0, 1).unwrap();
        let refreshed = record_refreshes(&b);
        a.get(0).unwrap().set_num1(9);

        assert!(refreshed.lock().is_empty());
        assert!(matches!(failures.lock().as_slice(), [BindError::DuplicateBinding(_)]));
    }

    #[test]
    fn removed_items_are_reported() {
        let (a, b) = (models(&[1, 2]), models(&[11, 12]));
        let binder = PropertyBinder::new(
            a.clone(),
            b.clone(),
            RefreshByIndex,
            BindingConfig::new().with_bidirectional(true),
        )
        .unwrap();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        binder
            .propagation_failures()
            .subscribe(move |err: &BindError| sink.lock().push(err.clone()));

        // Both pairs stay in the table after their items leave the lists
        let a0 = a.remove_at(0).unwrap();
        let b0 = b.remove_at(0).unwrap();
        let (source_refreshes, target_refreshes) = (record_refreshes(&a), record_refreshes(&b));
        b0.set_num1(4);
        a0.set_num1(5);

        assert_eq!(binder.binding_count(), 2);
        assert!(source_refreshes.lock().is_empty());
        assert!(target_refreshes.lock().is_empty());
        assert!(matches!(
            failures.lock().as_slice(),
            [BindError::DuplicateBinding(_), BindError::DuplicateBinding(_)]
        ));
    }

    #[test]
    fn fails_without_lists() {
        let binder: PropertyBinder<Model, Model> =
            PropertyBinder::detached(RefreshByIndex, BindingConfig::new());
        let (a, b) = (Model::new(1), Model::new(11));
        binder.bind(&a, &b).unwrap();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        binder
            .propagation_failures()
            .subscribe(move |err: &BindError| sink.lock().push(err.clone()));

        a.set_num1(1);

        assert!(matches!(failures.lock().as_slice(), [BindError::UnsupportedItem(_)]));
    }
}
