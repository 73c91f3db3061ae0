//! Component Definition - Per-type bookkeeping.
//!
//! One definition exists per registered component type. It owns the view
//! model factory and the auto-bind settings, and counts instances created
//! versus instances attached. Equal counts mean every known instance of the
//! type is live.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::types::{AutoBind, QueryParams, ViewModel, ViewModelFactory};

/// Registered component type.
pub struct ComponentDefinition {
    name: String,
    auto_bind: AutoBind,
    factory: ViewModelFactory,
    instance_count: Cell<usize>,
    attached_count: Cell<usize>,
}

impl ComponentDefinition {
    pub(crate) fn new(name: String, factory: ViewModelFactory, auto_bind: AutoBind) -> Self {
        Self {
            name,
            auto_bind,
            factory,
            instance_count: Cell::new(0),
            attached_count: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_bind(&self) -> &AutoBind {
        &self.auto_bind
    }

    /// Total instances ever created.
    pub fn instance_count(&self) -> usize {
        self.instance_count.get()
    }

    /// Total instances that delivered their attach signal.
    pub fn attached_count(&self) -> usize {
        self.attached_count.get()
    }

    /// Every created instance of this type has attached.
    pub fn is_complete(&self) -> bool {
        self.attached_count.get() == self.instance_count.get()
    }

    /// Build a view model through the registered factory.
    pub fn create_view_model(&self, params: &QueryParams) -> Rc<dyn ViewModel> {
        (self.factory)(params)
    }

    /// Returns the new instance's sequence number (1-based).
    pub(crate) fn track_instance(&self) -> usize {
        let next = self.instance_count.get() + 1;
        self.instance_count.set(next);
        next
    }

    /// Returns false, without counting, if every instance already attached.
    pub(crate) fn track_attached(&self) -> bool {
        let attached = self.attached_count.get();
        if attached >= self.instance_count.get() {
            return false;
        }
        self.attached_count.set(attached + 1);
        true
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("auto_bind", &self.auto_bind)
            .field("instance_count", &self.instance_count.get())
            .field("attached_count", &self.attached_count.get())
            .finish()
    }
}

/// Per-instance identifier: component name plus sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    name: String,
    seq: usize,
}

impl InstanceId {
    pub fn new(name: impl Into<String>, seq: usize) -> Self {
        Self {
            name: name.into(),
            seq,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seq(&self) -> usize {
        self.seq
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::factory;

    struct Empty;
    impl ViewModel for Empty {}

    fn definition() -> ComponentDefinition {
        ComponentDefinition::new("name-span".into(), factory(|_| Empty), AutoBind::default())
    }

    #[test]
    fn test_counts() {
        let def = definition();
        assert!(def.is_complete());

        assert_eq!(def.track_instance(), 1);
        assert_eq!(def.track_instance(), 2);
        assert!(!def.is_complete());

        assert!(def.track_attached());
        assert!(def.track_attached());
        assert!(def.is_complete());

        // Never exceeds instance count
        assert!(!def.track_attached());
        assert_eq!(def.attached_count(), 2);
    }

    #[test]
    fn test_instance_id_display() {
        let id = InstanceId::new("color-panel", 3);
        assert_eq!(id.to_string(), "color-panel-3");
    }
}
