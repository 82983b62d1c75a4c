//! Property binding.
//!
//! A [`PropertyBinder`] pairs the items of two lists by index and keeps each
//! pair in step. What "in step" means is decided by a
//! [`PropagationStrategy`]:
//!
//! - [`RefreshByIndex`]: signal an index refresh on the counterpart list
//! - [`CustomMap`]: run a caller-supplied [`PropertyMap`]
//! - [`NotifyForward`]: re-raise an "all properties" notification on the
//!   counterpart
//!
//! # Example
//!
//! ```ignore
//! let binder = PropertyBinder::new(
//!     models.clone(),
//!     views.clone(),
//!     NotifyForward,
//!     BindingConfig::new().with_bidirectional(true),
//! )?;
//!
//! models.get(0).unwrap().set_name("renamed"); // views[0] re-raises its notification
//! ```
//!
//! # Loop suppression
//!
//! Each binder holds one syncing flag. While a propagation runs, every
//! handler of that binder returns early, so a change bounced back from the
//! counterpart never propagates a second time.

mod binder;
mod config;
mod custom;
mod forward;
mod refresh;
mod strategy;
mod table;

#[cfg(test)]
pub(crate) mod fixtures;

pub use binder::PropertyBinder;
pub use config::BindingConfig;
pub use custom::{CustomMap, FnPropertyMap, PropertyMap};
pub use forward::NotifyForward;
pub use refresh::RefreshByIndex;
pub use strategy::{Propagation, PropagationStrategy};
pub use table::BindingSlot;
