//! Items shared by the binding unit tests.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collection::NotifyingList;
use crate::event::{Bindable, PropertyChange, PropertyChangedEvent, PropertyNotifier, TriggerNotification};

/// A notifying item with a number and a text property.
pub(crate) struct Model {
    id: u32,
    num1: AtomicI32,
    text: Mutex<String>,
    notifier: PropertyNotifier,
}

impl Model {
    pub(crate) fn new(id: u32) -> Arc<Self> {
        Arc::new(Self {
            id,
            num1: AtomicI32::new(0),
            text: Mutex::new(String::new()),
            notifier: PropertyNotifier::new(),
        })
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn num1(&self) -> i32 {
        self.num1.load(Ordering::SeqCst)
    }

    pub(crate) fn set_num1(&self, value: i32) {
        self.num1.store(value, Ordering::SeqCst);
        self.notifier.notify("Num1");
    }

    pub(crate) fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub(crate) fn set_text(&self, value: impl Into<String>) {
        *self.text.lock() = value.into();
        self.notifier.notify("Text");
    }

    /// Handlers currently attached to this item's event.
    pub(crate) fn notifier_handlers(&self) -> usize {
        self.notifier.event().handler_count()
    }

    /// Count every notification this item raises from now on.
    pub(crate) fn count_notifications(&self) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        self.notifier.event().subscribe(move |_: &PropertyChange| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        count
    }
}

impl Bindable for Model {
    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(self.notifier.event())
    }

    fn as_trigger(&self) -> Option<&dyn TriggerNotification> {
        Some(&self.notifier)
    }
}

/// An item that never notifies.
pub(crate) struct Silent;

impl Bindable for Silent {
    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        None
    }
}

/// A list of fresh models with the given ids.
pub(crate) fn models(ids: &[u32]) -> Arc<NotifyingList<Model>> {
    Arc::new(NotifyingList::from_items(ids.iter().map(|&id| Model::new(id))))
}
