//! Observable lists.
//!
//! [`ObservableList`] is the capability the binding engine needs from a
//! list: ordered, indexable, and emitting structural change events.
//! [`NotifyingList`] is the locking implementation used throughout the crate.
//!
//! # Locking
//!
//! A mutation holds the list's lock for its whole duration, from reading the
//! current state through the after-change notification:
//!
//! 1. Take an upgradable scope. Other writers are excluded, readers are not.
//! 2. Validate the request and build the change descriptor.
//! 3. Emit the before-change notification.
//! 4. Upgrade to a write scope and apply the change.
//! 5. Downgrade back to an upgradable scope and emit the after-change
//!    notification.
//!
//! Writers, including their notifications, are therefore totally ordered, and
//! notification handlers may read the list they are being notified about. A
//! handler that tries to mutate that same list from the notifying thread is
//! rejected with [`BindError::Reentrancy`](crate::BindError::Reentrancy)
//! instead of deadlocking.

use std::fmt::{self, Debug};
use std::sync::Arc;

use super::aggregator::{ChangeAggregator, Phase};
use super::change::CollectionChange;
use crate::error::{check_index, Result};
use crate::sync::{ScopedRwLock, ThreadReentrancyMonitor};

/// An ordered, indexable list that emits structural change events.
pub trait ObservableList<T>: Send + Sync {
    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the list is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `index`.
    fn get(&self, index: usize) -> Option<Arc<T>>;

    /// A copy of the current contents.
    fn snapshot(&self) -> Vec<Arc<T>>;

    /// Index of the first occurrence of `item`, compared by identity.
    fn index_of(&self, item: &Arc<T>) -> Option<usize> {
        self.snapshot()
            .iter()
            .position(|candidate| Arc::ptr_eq(candidate, item))
    }

    /// Replace the item at `index`, returning the old item.
    fn set(&self, index: usize, item: Arc<T>) -> Result<Arc<T>>;

    /// Insert `item` at `index`; `index == len` appends.
    fn insert(&self, index: usize, item: Arc<T>) -> Result<()>;

    /// Remove and return the item at `index`.
    fn remove_at(&self, index: usize) -> Result<Arc<T>>;

    /// Move the item at `old_index` to `new_index`.
    fn move_item(&self, old_index: usize, new_index: usize) -> Result<()>;

    /// Replace the whole contents with `items`.
    fn reset(&self, items: Vec<Arc<T>>) -> Result<()>;

    /// Remove every item.
    fn clear(&self) -> Result<()> {
        self.reset(Vec::new())
    }

    /// Signal that the contents of the item at `index` changed.
    ///
    /// The list itself is not modified; a replace of the item with itself is
    /// emitted.
    fn refresh_at(&self, index: usize) -> Result<()>;

    /// The list's change events.
    fn changes(&self) -> &ChangeAggregator<T>;
}

/// Thread-safe list that notifies on every structural change.
///
/// A change handler may read the list, but it may not mutate it: any nested
/// mutation from the same thread fails with
/// [`BindError::Reentrancy`](crate::error::BindError::Reentrancy) before
/// a lock is taken. The aggregator's single-subscriber allowance therefore
/// never applies to this list; it only matters when a [`ChangeAggregator`]
/// is driven directly.
pub struct NotifyingList<T> {
    items: ScopedRwLock<Vec<Arc<T>>>,
    mutating: ThreadReentrancyMonitor,
    changes: ChangeAggregator<T>,
}

impl<T> NotifyingList<T>
where
    T: Send + Sync + 'static,
{
    /// Create an empty list.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Create a list holding `items`.
    pub fn from_items(items: impl IntoIterator<Item = Arc<T>>) -> Self {
        Self {
            items: ScopedRwLock::new(items.into_iter().collect()),
            mutating: ThreadReentrancyMonitor::new(),
            changes: ChangeAggregator::new(),
        }
    }

    /// Append `item`.
    pub fn push(&self, item: Arc<T>) -> Result<()> {
        self.mutate(|items| {
            let change = CollectionChange::Add {
                items: vec![Arc::clone(&item)],
                index: items.len(),
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| items.push(item)))
        })
    }

    /// Insert `new_items` contiguously starting at `index`.
    pub fn insert_many(&self, index: usize, new_items: Vec<Arc<T>>) -> Result<()> {
        self.mutate(|items| {
            check_index(index, items.len() + 1)?;
            let change = CollectionChange::Add {
                items: new_items.clone(),
                index,
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| {
                items.splice(index..index, new_items);
            }))
        })
    }

    /// Run one mutation under the list's locking protocol.
    ///
    /// `plan` inspects the current contents and returns the descriptor to
    /// announce together with the edit to apply. Nothing is emitted if
    /// planning fails.
    fn mutate<R, E, F>(&self, plan: F) -> Result<R>
    where
        F: FnOnce(&[Arc<T>]) -> Result<(CollectionChange<T>, E)>,
        E: FnOnce(&mut Vec<Arc<T>>) -> R,
    {
        let _entered = self.mutating.enter()?;
        let scope = self.items.acquire_upgradable();

        let (change, edit) = plan(scope.as_slice())?;
        self.changes.check_reentrancy()?;
        self.changes.notify(Phase::Before, &change)?;

        let mut write = scope.upgrade();
        let output = edit(&mut *write);
        let scope = write.downgrade_to_upgradable();

        self.changes.notify(Phase::After, &change)?;
        scope.release();
        Ok(output)
    }
}

impl<T> ObservableList<T> for NotifyingList<T>
where
    T: Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.items.acquire_read().len()
    }

    fn get(&self, index: usize) -> Option<Arc<T>> {
        self.items.acquire_read().get(index).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<T>> {
        self.items.acquire_read().clone()
    }

    fn index_of(&self, item: &Arc<T>) -> Option<usize> {
        self.items
            .acquire_read()
            .iter()
            .position(|candidate| Arc::ptr_eq(candidate, item))
    }

    fn set(&self, index: usize, item: Arc<T>) -> Result<Arc<T>> {
        self.mutate(|items| {
            check_index(index, items.len())?;
            let change = CollectionChange::Replace {
                old_item: Arc::clone(&items[index]),
                new_item: Arc::clone(&item),
                index,
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| {
                std::mem::replace(&mut items[index], item)
            }))
        })
    }

    fn insert(&self, index: usize, item: Arc<T>) -> Result<()> {
        self.mutate(|items| {
            check_index(index, items.len() + 1)?;
            let change = CollectionChange::Add {
                items: vec![Arc::clone(&item)],
                index,
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| items.insert(index, item)))
        })
    }

    fn remove_at(&self, index: usize) -> Result<Arc<T>> {
        self.mutate(|items| {
            check_index(index, items.len())?;
            let change = CollectionChange::Remove {
                item: Arc::clone(&items[index]),
                index,
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| items.remove(index)))
        })
    }

    fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        self.mutate(|items| {
            check_index(old_index, items.len())?;
            check_index(new_index, items.len())?;
            let change = CollectionChange::Move {
                item: Arc::clone(&items[old_index]),
                index: new_index,
                old_index,
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| {
                let item = items.remove(old_index);
                items.insert(new_index, item);
            }))
        })
    }

    fn reset(&self, new_items: Vec<Arc<T>>) -> Result<()> {
        self.mutate(|_| {
            let change = CollectionChange::Reset {
                items: new_items.clone(),
            };
            Ok((change, move |items: &mut Vec<Arc<T>>| *items = new_items))
        })
    }

    fn refresh_at(&self, index: usize) -> Result<()> {
        self.mutate(|items| {
            check_index(index, items.len())?;
            let item = Arc::clone(&items[index]);
            let change = CollectionChange::Replace {
                old_item: Arc::clone(&item),
                new_item: item,
                index,
            };
            Ok((change, |_: &mut Vec<Arc<T>>| ()))
        })
    }

    fn changes(&self) -> &ChangeAggregator<T> {
        &self.changes
    }
}

impl<T> Default for NotifyingList<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for NotifyingList<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyingList")
            .field("items", &*self.items.acquire_read())
            .finish()
    }
}

impl<T> From<Vec<Arc<T>>> for NotifyingList<T>
where
    T: Send + Sync + 'static,
{
    fn from(items: Vec<Arc<T>>) -> Self {
        Self::from_items(items)
    }
}

/// Wrap `values` in `Arc`s and build a list from them.
pub fn list_of<T>(values: impl IntoIterator<Item = T>) -> NotifyingList<T>
where
    T: Send + Sync + 'static,
{
    NotifyingList::from_items(values.into_iter().map(Arc::new))
}
