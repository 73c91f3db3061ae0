//! Auto-bind Collections - Page-level dialogs, headers and footers.
//!
//! Each collection holds at most one component per type. Headers and footers
//! stay sorted ascending by `sort_index` (stable, so equal indices keep
//! insertion order); a missing or NaN index sorts before everything else.

use std::cmp::Ordering;
use std::fmt;

use spark_signals::{Signal, signal};

use crate::engine::Component;
use crate::error::{LoaderError, Result};

/// Page slot a component can be auto-bound into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoBindSlot {
    Dialog,
    Header,
    Footer,
}

impl AutoBindSlot {
    /// Headers and footers are kept sorted; dialogs keep insertion order.
    pub fn is_sorted(self) -> bool {
        !matches!(self, AutoBindSlot::Dialog)
    }
}

impl fmt::Display for AutoBindSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutoBindSlot::Dialog => "dialog",
            AutoBindSlot::Header => "header",
            AutoBindSlot::Footer => "footer",
        };
        f.write_str(name)
    }
}

/// Sort key for a component: a missing or NaN index counts as the smallest value.
fn sort_key(component: &Component) -> f64 {
    match component.sort_index() {
        Some(index) if !index.is_nan() => index,
        _ => f64::NEG_INFINITY,
    }
}

fn by_sort_index(a: &Component, b: &Component) -> Ordering {
    sort_key(a).total_cmp(&sort_key(b))
}

/// Observable, ordered list of auto-bound components.
#[derive(Clone)]
pub struct AutoBindList {
    slot: AutoBindSlot,
    items: Signal<Vec<Component>>,
}

impl AutoBindList {
    pub fn new(slot: AutoBindSlot) -> Self {
        Self {
            slot,
            items: signal(Vec::new()),
        }
    }

    pub fn slot(&self) -> AutoBindSlot {
        self.slot
    }

    /// Add a component, keeping sort order for headers and footers.
    ///
    /// # Errors
    ///
    /// `DuplicateAutoBind` if a component of the same type is already present.
    pub fn insert(&self, component: Component) -> Result<()> {
        let mut items = self.items.get();
        let duplicate = items.iter().any(|c| c.name() == component.name());
        if duplicate {
            return Err(LoaderError::DuplicateAutoBind {
                name: component.name().to_string(),
                slot: self.slot,
            });
        }

        tracing::debug!(component = component.name(), slot = %self.slot, "auto-bound component");
        items.push(component);
        if self.slot.is_sorted() {
            // Vec::sort_by is stable
            items.sort_by(by_sort_index);
        }
        self.items.set(items);
        Ok(())
    }

    /// True if a component of type `name` is already in the collection.
    pub fn contains(&self, name: &str) -> bool {
        self.items.get().iter().any(|c| c.name() == name)
    }

    /// Snapshot of the components in presentation order.
    pub fn items(&self) -> Vec<Component> {
        self.items.get()
    }

    pub fn signal(&self) -> Signal<Vec<Component>> {
        self.items.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.items
            .get()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
