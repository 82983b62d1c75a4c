//! Events
//!
//! Multicast events and the item-level change notification contract.
//!
//! An emitter owns an [`Event`], which is an explicit ordered list of
//! callback handles. Subscribing returns a [`HandlerId`]; unsubscribing
//! takes that id back. Bindings rely on this symmetry: every handler a
//! binder attaches is removed by the id it got when attaching.

mod handler;
mod item;

pub use handler::{Event, HandlerId};
pub use item::{
    Bindable, PropertyChange, PropertyChangedEvent, PropertyNotifier, TriggerNotification,
};
