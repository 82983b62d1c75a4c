//! Duplex Core
//!
//! This crate provides the engine that keeps two lists of items bound to
//! each other. It implements:
//!
//! - Scoped locks, syncing flags and reentrancy monitors
//! - An event multicast used for item and collection notifications
//! - A notifying list with before/after structural change events
//! - A property binder with pluggable propagation strategies
//! - A list synchronizer that mirrors structural changes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `sync`: Scoped RW lock, syncing flag and reentrancy monitors
//! - `event`: Event multicast and the item notification capability
//! - `collection`: Change descriptors, the change aggregator and lists
//! - `binding`: Binding table, binder and propagation strategies
//! - `synchronizer`: Structural mirroring between two lists
//!
//! All work happens synchronously on the thread that made a change. The
//! crate starts no threads of its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use duplex_core::{BindingConfig, Converters, ListSynchronizer, NotifyForward, PropertyBinder};
//!
//! // Model list and view-model list
//! let people = Arc::new(list_of(vec![person("ann"), person("bob")]));
//! let rows = Arc::new(NotifyingList::new());
//!
//! // Keep rows structurally in step, and re-raise a row's notification
//! // whenever its person changes
//! let sync = ListSynchronizer::new(
//!     people.clone(),
//!     rows.clone(),
//!     Converters::one_way(Row::over),
//!     PropertyBinder::detached(NotifyForward, BindingConfig::new()),
//! )?;
//!
//! people.push(person("cy"))?;       // rows gains a bound row for cy
//! people.get(0).unwrap().rename("anne"); // rows[0] notifies its listeners
//! ```

pub mod binding;
pub mod collection;
pub mod error;
pub mod event;
pub mod sync;
pub mod synchronizer;

pub use binding::{
    BindingConfig, BindingSlot, CustomMap, FnPropertyMap, NotifyForward, Propagation,
    PropagationStrategy, PropertyBinder, PropertyMap, RefreshByIndex,
};
pub use collection::{list_of, ChangeKind, CollectionChange, NotifyingList, ObservableList};
pub use error::{BindError, Result};
pub use event::{Bindable, Event, PropertyChange, PropertyNotifier, TriggerNotification};
pub use synchronizer::{Converters, ListSynchronizer};
