//! The binding table.
//!
//! Each bound pair gets a [`BindingSlot`] when it is bound, and entries are
//! keyed by that slot. A side index maps target identity to slot so the
//! "no duplicate targets" rule can be checked in constant time. Identity is
//! the address of the item's allocation; the entry holds an `Arc` to the
//! target, so the address cannot be reused while the entry exists.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{BindError, Result};
use crate::event::HandlerId;

/// Stable identifier of one bound pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSlot(u64);

impl BindingSlot {
    /// Get the raw slot value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Identity of a shared item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ItemKey(usize);

impl ItemKey {
    pub(crate) fn of<T>(item: &Arc<T>) -> Self {
        Self(Arc::as_ptr(item).cast::<()>() as usize)
    }
}

/// One bound pair and the handlers attached for it.
pub(crate) struct BindingEntry<S, T> {
    pub(crate) source: Arc<S>,
    pub(crate) target: Arc<T>,
    pub(crate) source_handler: HandlerId,
    pub(crate) target_handler: Option<HandlerId>,
}

/// Every pair currently bound by one binder, in bind order.
pub(crate) struct BindingTable<S, T> {
    entries: IndexMap<BindingSlot, BindingEntry<S, T>>,
    by_target: HashMap<ItemKey, BindingSlot>,
    next_slot: u64,
}

impl<S, T> BindingTable<S, T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            by_target: HashMap::new(),
            next_slot: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Slot of the pair whose target is `target`.
    pub(crate) fn slot_of_target(&self, target: &Arc<T>) -> Option<BindingSlot> {
        self.by_target.get(&ItemKey::of(target)).copied()
    }

    /// Source bound to `target`, if any.
    pub(crate) fn source_of(&self, target: &Arc<T>) -> Option<&Arc<S>> {
        self.slot_of_target(target)
            .and_then(|slot| self.entries.get(&slot))
            .map(|entry| &entry.source)
    }

    /// Fail if `target` already has an entry.
    pub(crate) fn ensure_unbound(&self, target: &Arc<T>) -> Result<()> {
        match self.slot_of_target(target) {
            Some(slot) => Err(BindError::DuplicateBinding(format!(
                "target item is already bound in slot {}",
                slot.raw()
            ))),
            None => Ok(()),
        }
    }

    /// Add an entry and return its new slot.
    pub(crate) fn insert(&mut self, entry: BindingEntry<S, T>) -> Result<BindingSlot> {
        self.ensure_unbound(&entry.target)?;

        let slot = BindingSlot(self.next_slot);
        self.next_slot += 1;
        self.by_target.insert(ItemKey::of(&entry.target), slot);
        self.entries.insert(slot, entry);
        Ok(slot)
    }

    /// Remove the entry binding `source` to `target`.
    ///
    /// Returns `None`, leaving the table untouched, if `target` is unbound
    /// or bound to a different source.
    pub(crate) fn remove_pair(&mut self, source: &Arc<S>, target: &Arc<T>) -> Option<BindingEntry<S, T>> {
        let slot = self.slot_of_target(target)?;
        let matches = self
            .entries
            .get(&slot)
            .is_some_and(|entry| Arc::ptr_eq(&entry.source, source));
        if !matches {
            return None;
        }

        self.by_target.remove(&ItemKey::of(target));
        self.entries.shift_remove(&slot)
    }

    /// Remove every entry, in bind order.
    pub(crate) fn drain(&mut self) -> Vec<BindingEntry<S, T>> {
        self.by_target.clear();
        self.entries.drain(..).map(|(_, entry)| entry).collect()
    }

    /// Every bound pair, in bind order.
    pub(crate) fn pairs(&self) -> Vec<(Arc<S>, Arc<T>)> {
        self.entries
            .values()
            .map(|entry| (Arc::clone(&entry.source), Arc::clone(&entry.target)))
            .collect()
    }
}
