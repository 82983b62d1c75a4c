//! Observable Collections
//!
//! Structural change descriptors, the change-notification aggregator, and
//! the list capability the binding engine consumes.
//!
//! # Change Events
//!
//! Every structural change (add, remove, move, replace, reset) is announced
//! twice, once before and once after the mutation. Each announcement fires
//! the generic "any change" event first and the kind-specific event second.
//! See [`ChangeAggregator`] for the exact order and the reentrancy rules.

mod aggregator;
mod change;
mod list;

pub use aggregator::{ChangeAggregator, Channel, Phase};
pub use change::{ChangeKind, CollectionChange};
pub use list::{list_of, NotifyingList, ObservableList};
