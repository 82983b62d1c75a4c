//! Change-notifying item capability.
//!
//! Items that take part in a binding expose a per-property change event.
//! Items that want the notify-forward strategy must also be able to re-raise
//! a notification on demand through [`TriggerNotification`]. There is no
//! fallback for items that cannot: the strategy fails with
//! [`UnsupportedItem`](crate::BindError::UnsupportedItem).

use super::Event;

/// Describes which property of an item changed.
///
/// A change with no property name means "every property may have changed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PropertyChange {
    property: Option<String>,
}

impl PropertyChange {
    /// A change of a single named property.
    ///
    /// An empty name is treated as [`PropertyChange::all`].
    pub fn named(property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            property: (!property.is_empty()).then_some(property),
        }
    }

    /// A change of every property.
    pub fn all() -> Self {
        Self { property: None }
    }

    /// The changed property's name, or `None` if every property changed.
    pub fn property_name(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Whether this change covers every property.
    pub fn is_all(&self) -> bool {
        self.property.is_none()
    }

    /// Whether this change covers the property `name`.
    pub fn affects(&self, name: &str) -> bool {
        self.property.as_deref().map_or(true, |property| property == name)
    }
}

/// Event raised by an item when one of its properties changes.
pub type PropertyChangedEvent = Event<PropertyChange>;

/// Explicit "raise a notification from outside" capability.
pub trait TriggerNotification {
    /// Raise `change` on the item's property-changed event.
    fn trigger_notification(&self, change: &PropertyChange);
}

/// An item that can take part in a binding.
pub trait Bindable: Send + Sync + 'static {
    /// The item's property-changed event, or `None` if the item never
    /// notifies.
    fn property_changed(&self) -> Option<&PropertyChangedEvent>;

    /// The item's re-raise capability, if it has one.
    fn as_trigger(&self) -> Option<&dyn TriggerNotification> {
        None
    }
}

/// Owns a property-changed event on behalf of an item.
///
/// Embed one in an item type, return [`event`](Self::event) from
/// [`Bindable::property_changed`], and call [`notify`](Self::notify) from
/// the item's setters.
#[derive(Debug, Default)]
pub struct PropertyNotifier {
    event: PropertyChangedEvent,
}

impl PropertyNotifier {
    /// Create a notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying event.
    pub fn event(&self) -> &PropertyChangedEvent {
        &self.event
    }

    /// Announce that `property` changed.
    pub fn notify(&self, property: &str) {
        self.event.emit(&PropertyChange::named(property));
    }

    /// Announce that every property changed.
    pub fn notify_all(&self) {
        self.event.emit(&PropertyChange::all());
    }
}

impl TriggerNotification for PropertyNotifier {
    fn trigger_notification(&self, change: &PropertyChange) {
        self.event.emit(change);
    }
}
