//! Structural change descriptors.

use std::fmt::{self, Debug};
use std::sync::Arc;

/// The kind of a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Remove,
    Move,
    Replace,
    Reset,
}

impl ChangeKind {
    /// All kinds, in declaration order.
    pub const ALL: [ChangeKind; 5] = [
        ChangeKind::Add,
        ChangeKind::Remove,
        ChangeKind::Move,
        ChangeKind::Replace,
        ChangeKind::Reset,
    ];
}

/// A structural change to an ordered collection.
pub enum CollectionChange<T> {
    /// One or more items inserted contiguously starting at `index`.
    Add { items: Vec<Arc<T>>, index: usize },

    /// `item` removed from `index`.
    Remove { item: Arc<T>, index: usize },

    /// `item` moved from `old_index` to `index`.
    Move {
        item: Arc<T>,
        index: usize,
        old_index: usize,
    },

    /// The item at `index` replaced. When `old_item` and `new_item` are the
    /// same item this only signals that the item's contents changed.
    Replace {
        old_item: Arc<T>,
        new_item: Arc<T>,
        index: usize,
    },

    /// The whole collection replaced by `items`.
    Reset { items: Vec<Arc<T>> },
}

impl<T> CollectionChange<T> {
    /// The change's kind.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Add { .. } => ChangeKind::Add,
            Self::Remove { .. } => ChangeKind::Remove,
            Self::Move { .. } => ChangeKind::Move,
            Self::Replace { .. } => ChangeKind::Replace,
            Self::Reset { .. } => ChangeKind::Reset,
        }
    }

    /// The index the change applies at, if it has one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Add { index, .. }
            | Self::Remove { index, .. }
            | Self::Move { index, .. }
            | Self::Replace { index, .. } => Some(*index),
            Self::Reset { .. } => None,
        }
    }

    /// The previous index of a moved item.
    pub fn old_index(&self) -> Option<usize> {
        match self {
            Self::Move { old_index, .. } => Some(*old_index),
            _ => None,
        }
    }

    /// Whether this is a replace of an item with itself.
    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::Replace { old_item, new_item, .. } if Arc::ptr_eq(old_item, new_item))
    }
}

impl<T> Clone for CollectionChange<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Add { items, index } => Self::Add {
                items: items.clone(),
                index: *index,
            },
            Self::Remove { item, index } => Self::Remove {
                item: Arc::clone(item),
                index: *index,
            },
            Self::Move {
                item,
                index,
                old_index,
            } => Self::Move {
                item: Arc::clone(item),
                index: *index,
                old_index: *old_index,
            },
            Self::Replace {
                old_item,
                new_item,
                index,
            } => Self::Replace {
                old_item: Arc::clone(old_item),
                new_item: Arc::clone(new_item),
                index: *index,
            },
            Self::Reset { items } => Self::Reset {
                items: items.clone(),
            },
        }
    }
}

impl<T> Debug for CollectionChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("CollectionChange");
        out.field("kind", &self.kind());
        if let Some(index) = self.index() {
            out.field("index", &index);
        }
        if let Some(old_index) = self.old_index() {
            out.field("old_index", &old_index);
        }
        out.finish()
    }
}
