//! Notify-forward strategy.
//!
//! For counterparts whose getters already compute their values from the
//! bound item (a view model over a model), there is nothing to copy. The
//! counterpart only needs to tell its own listeners that everything may
//! have changed, so a change on one side re-raises an "all properties"
//! notification on the other.
//!
//! The counterpart must expose [`TriggerNotification`] through
//! [`Bindable::as_trigger`]. Pairs without it are rejected when bound, and a
//! propagation that still finds it missing fails with
//! [`BindError::UnsupportedItem`] instead of doing nothing.

use super::config::BindingConfig;
use super::strategy::{Propagation, PropagationStrategy};
use crate::error::{BindError, Result};
use crate::event::{Bindable, PropertyChange, TriggerNotification};

/// Re-raises a full change notification on the counterpart item.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyForward;

impl NotifyForward {
    pub fn new() -> Self {
        Self
    }
}

fn trigger_of<'a>(item: &'a dyn Bindable, side: &str) -> Result<&'a dyn TriggerNotification> {
    item.as_trigger().ok_or_else(|| {
        BindError::UnsupportedItem(format!(
            "notify-forward needs a {side} item that can raise notifications externally"
        ))
    })
}

impl<S, T> PropagationStrategy<S, T> for NotifyForward
where
    S: Bindable,
    T: Bindable,
{
    fn name(&self) -> &'static str {
        "notify-forward"
    }

    fn check_pair(&self, source: &S, target: &T, config: &BindingConfig) -> Result<()> {
        trigger_of(target, "target")?;
        if config.bidirectional {
            trigger_of(source, "source")?;
        }
        Ok(())
    }

    fn on_source_changed(&self, cx: &Propagation<'_, S, T>, _change: &PropertyChange) -> Result<()> {
        trigger_of(&**cx.target(), "target")?.trigger_notification(&PropertyChange::all());
        Ok(())
    }

    fn on_target_changed(&self, cx: &Propagation<'_, S, T>, _change: &PropertyChange) -> Result<()> {
        trigger_of(&**cx.source(), "source")?.trigger_notification(&PropertyChange::all());
        Ok(())
    }
}
