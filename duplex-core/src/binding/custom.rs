//! Custom-map strategy.
//!
//! The engine has no default mapping. Every change is handed to a
//! caller-supplied [`PropertyMap`], which decides which property of the
//! counterpart to write. A property the map does not know about is simply
//! ignored by the map.

use std::fmt::{self, Debug};

use indexmap::IndexMap;

use super::strategy::{Propagation, PropagationStrategy};
use crate::error::Result;
use crate::event::{Bindable, PropertyChange};

/// A pair of mapping functions between two item types.
pub trait PropertyMap<S, T>: Send + Sync {
    /// Reflect `change` on `source` into `target`.
    fn map_source_to_target(&self, change: &PropertyChange, source: &S, target: &T) -> Result<()>;

    /// Reflect `change` on `target` into `source`.
    fn map_target_to_source(&self, change: &PropertyChange, target: &T, source: &S) -> Result<()>;
}

/// Delegates every propagation to a [`PropertyMap`].
#[derive(Debug, Clone, Default)]
pub struct CustomMap<M> {
    map: M,
}

impl<M> CustomMap<M> {
    pub fn new(map: M) -> Self {
        Self { map }
    }

    /// The wrapped map.
    pub fn map(&self) -> &M {
        &self.map
    }
}

impl<S, T, M> PropagationStrategy<S, T> for CustomMap<M>
where
    S: Bindable,
    T: Bindable,
    M: PropertyMap<S, T>,
{
    fn name(&self) -> &'static str {
        "custom-map"
    }

    fn on_source_changed(&self, cx: &Propagation<'_, S, T>, change: &PropertyChange) -> Result<()> {
        self.map.map_source_to_target(change, cx.source(), cx.target())
    }

    fn on_target_changed(&self, cx: &Propagation<'_, S, T>, change: &PropertyChange) -> Result<()> {
        self.map.map_target_to_source(change, cx.target(), cx.source())
    }
}

type Rule<A, B> = Box<dyn Fn(&A, &B) + Send + Sync>;

/// A [`PropertyMap`] built from per-property closures.
///
/// ```ignore
/// let map = FnPropertyMap::new()
///     .on_source("Num1", |source: &Model, target: &View| {
///         target.set_label(format!("Number: {}", source.num1()));
///     });
/// ```
///
/// A change naming a property runs that property's rule, if there is one.
/// An "all properties" change runs every rule for that direction, in the
/// order they were added.
pub struct FnPropertyMap<S, T> {
    to_target: IndexMap<String, Rule<S, T>>,
    to_source: IndexMap<String, Rule<T, S>>,
}

impl<S, T> FnPropertyMap<S, T> {
    /// A map with no rules.
    pub fn new() -> Self {
        Self {
            to_target: IndexMap::new(),
            to_source: IndexMap::new(),
        }
    }

    /// When `property` changes on the source, run `rule(source, target)`.
    ///
    /// Replaces any earlier rule for the same property.
    pub fn on_source<F>(mut self, property: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&S, &T) + Send + Sync + 'static,
    {
        self.to_target.insert(property.into(), Box::new(rule));
        self
    }

    /// When `property` changes on the target, run `rule(target, source)`.
    pub fn on_target<F>(mut self, property: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&T, &S) + Send + Sync + 'static,
    {
        self.to_source.insert(property.into(), Box::new(rule));
        self
    }
}

fn run_rules<A, B>(rules: &IndexMap<String, Rule<A, B>>, change: &PropertyChange, from: &A, to: &B) {
    match change.property_name() {
        Some(name) => {
            if let Some(rule) = rules.get(name) {
                rule(from, to);
            }
        }
        None => rules.values().for_each(|rule| rule(from, to)),
    }
}

impl<S, T> PropertyMap<S, T> for FnPropertyMap<S, T> {
    fn map_source_to_target(&self, change: &PropertyChange, source: &S, target: &T) -> Result<()> {
        run_rules(&self.to_target, change, source, target);
        Ok(())
    }

    fn map_target_to_source(&self, change: &PropertyChange, target: &T, source: &S) -> Result<()> {
        run_rules(&self.to_source, change, target, source);
        Ok(())
    }
}

impl<S, T> Default for FnPropertyMap<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> Debug for FnPropertyMap<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPropertyMap")
            .field("to_target", &self.to_target.keys().collect::<Vec<_>>())
            .field("to_source", &self.to_source.keys().collect::<Vec<_>>())
            .finish()
    }
}
