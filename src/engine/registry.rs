//! Definition Registry - Component types and the page-wide attach barrier.
//!
//! Manages the lifecycle of component definitions:
//! - Name → definition table (one entry per component type)
//! - Instance creation and attach counting per type
//! - Cross-type completion check (every type's attached == created)
//! - Event listeners (the page loader subscribes here)
//!
//! The registry is an explicit service: create one per page load and hand
//! clones to whoever needs it. Clones share state. Use [`DefinitionRegistry::reset`]
//! when a process reuses one registry across several page loads.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::completion::{ChildOptions, CompletionNode};
use super::component::Component;
use super::definition::{ComponentDefinition, InstanceId};
use crate::error::{LoaderError, Result};
use crate::types::{AutoBind, Cleanup, QueryParams, ViewModel, ViewModelFactory, component_name_of};

// =============================================================================
// Events
// =============================================================================

/// Notifications emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A new component type was registered.
    Registered { name: String },
    /// An instance was created; the page is no longer fully attached.
    InstanceCreated { id: InstanceId },
    /// Every created instance of every type has attached.
    AllAttached,
}

/// Registry event listener.
pub type RegistryListener = Rc<dyn Fn(&RegistryEvent)>;

// =============================================================================
// Registry State
// =============================================================================

#[derive(Default)]
struct RegistryInner {
    /// Registration order is kept so diagnostics and stylesheet injection are stable.
    definitions: IndexMap<String, Rc<ComponentDefinition>>,
    listeners: Vec<(usize, RegistryListener)>,
    next_listener_id: usize,
}

/// Shared table of component definitions.
#[derive(Clone, Default)]
pub struct DefinitionRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a component type under `name`.
    ///
    /// # Errors
    ///
    /// `DuplicateRegistration` if the name is taken. The registry is left
    /// untouched in that case.
    pub fn register_type(
        &self,
        name: impl Into<String>,
        factory: ViewModelFactory,
        auto_bind: AutoBind,
    ) -> Result<Rc<ComponentDefinition>> {
        let name = name.into();
        let definition = {
            let mut inner = self.inner.borrow_mut();
            if inner.definitions.contains_key(&name) {
                return Err(LoaderError::DuplicateRegistration { name });
            }
            let definition = Rc::new(ComponentDefinition::new(name.clone(), factory, auto_bind));
            inner.definitions.insert(name.clone(), definition.clone());
            definition
        };

        tracing::debug!(component = %name, "registered component");
        self.emit(&RegistryEvent::Registered { name });
        Ok(definition)
    }

    /// Register a component type named after the Rust type `T`.
    ///
    /// `ColorPanel` registers as `color-panel`.
    pub fn register<T: ViewModel + ?Sized>(
        &self,
        factory: ViewModelFactory,
        auto_bind: AutoBind,
    ) -> Result<Rc<ComponentDefinition>> {
        self.register_type(component_name_of::<T>(), factory, auto_bind)
    }

    // =========================================================================
    // Instance Counting
    // =========================================================================

    /// Count a newly created instance of `name`.
    ///
    /// # Returns
    ///
    /// The instance identifier (`name-<seq>`).
    pub fn record_instance_created(&self, name: &str) -> Result<InstanceId> {
        let definition = self.require(name)?;
        let id = InstanceId::new(name, definition.track_instance());

        tracing::trace!(instance = %id, "instance created");
        self.emit(&RegistryEvent::InstanceCreated { id: id.clone() });
        Ok(id)
    }

    /// Count an attach signal for an instance of `name`.
    ///
    /// When this brings the type to equality, every definition is re-scanned:
    /// completion needs all types equal at the same time.
    ///
    /// # Returns
    ///
    /// `true` if this attach completed the page-wide barrier.
    pub fn record_instance_attached(&self, name: &str) -> Result<bool> {
        let definition = self.require(name)?;
        if !definition.track_attached() {
            return Err(LoaderError::ExcessAttach {
                name: name.to_string(),
            });
        }

        if !definition.is_complete() {
            return Ok(false);
        }

        let all_attached = self.is_all_attached();
        if all_attached {
            tracing::debug!(component = name, "all component instances attached");
            self.emit(&RegistryEvent::AllAttached);
        }
        Ok(all_attached)
    }

    /// Every registered type has as many attached instances as created ones.
    pub fn is_all_attached(&self) -> bool {
        self.inner
            .borrow()
            .definitions
            .values()
            .all(|definition| definition.is_complete())
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Create an instance of `name` under `parent`.
    ///
    /// Builds the view model through the type's factory, counts the instance
    /// and creates its completion node as a child of `parent`.
    pub fn instantiate(
        &self,
        name: &str,
        params: &QueryParams,
        parent: &CompletionNode,
    ) -> Result<Component> {
        let definition = self.require(name)?;
        let view_model = definition.create_view_model(params);
        self.track(definition, view_model, params.clone(), parent)
    }

    /// Track a view model that was constructed programmatically.
    ///
    /// Same bookkeeping as [`instantiate`](Self::instantiate), without calling
    /// the factory.
    pub fn adopt(
        &self,
        name: &str,
        view_model: Rc<dyn ViewModel>,
        parent: &CompletionNode,
    ) -> Result<Component> {
        let definition = self.require(name)?;
        let params = definition.auto_bind().params.clone();
        self.track(definition, view_model, params, parent)
    }

    fn track(
        &self,
        definition: Rc<ComponentDefinition>,
        view_model: Rc<dyn ViewModel>,
        params: QueryParams,
        parent: &CompletionNode,
    ) -> Result<Component> {
        // Node first: a listener reacting to InstanceCreated already sees it in the tree
        let node = parent.child(ChildOptions::named(definition.name()));
        let id = self.record_instance_created(definition.name())?;
        let component = Component::new(definition, id, node, view_model, params, self.clone());
        Ok(component)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.inner.borrow().definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().definitions.contains_key(name)
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> Vec<Rc<ComponentDefinition>> {
        self.inner.borrow().definitions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().definitions.is_empty()
    }

    fn require(&self, name: &str) -> Result<Rc<ComponentDefinition>> {
        let missing = || LoaderError::MissingRegistration {
            name: name.to_string(),
        };
        self.get(name).ok_or_else(missing)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Subscribe to registry events.
    ///
    /// Returns cleanup function to unsubscribe.
    pub fn subscribe(&self, listener: impl Fn(&RegistryEvent) + 'static) -> Cleanup {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };

        let weak: Weak<RefCell<RegistryInner>> = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .borrow_mut()
                    .listeners
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    fn emit(&self, event: &RegistryEvent) {
        let listeners: Vec<RegistryListener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Forget every definition and count. Listeners stay subscribed.
    pub fn reset(&self) {
        self.inner.borrow_mut().definitions.clear();
    }
}

impl fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let definitions: Vec<_> = inner.definitions.values().collect();
        f.debug_struct("DefinitionRegistry")
            .field("definitions", &definitions)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::factory;

    struct ColorPanel;
    impl ViewModel for ColorPanel {}

    struct NameSpan;
    impl ViewModel for NameSpan {}

    fn events(registry: &DefinitionRegistry) -> Rc<RefCell<Vec<RegistryEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        // Kept subscribed for the whole test
        let _ = registry.subscribe(move |event| seen_clone.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn test_register_type() {
        let registry = DefinitionRegistry::new();
        let def = registry
            .register::<ColorPanel>(factory(|_| ColorPanel), AutoBind::default())
            .unwrap();

        assert_eq!(def.name(), "color-panel");
        assert_eq!(def.instance_count(), 0);
        assert_eq!(def.attached_count(), 0);
        assert!(registry.contains("color-panel"));
    }

    #[test]
    fn test_duplicate_registration_leaves_registry_unchanged() {
        let registry = DefinitionRegistry::new();
        registry
            .register_type("color-panel", factory(|_| ColorPanel), AutoBind::dialog())
            .unwrap();
        registry.record_instance_created("color-panel").unwrap();

        let err = registry
            .register_type("color-panel", factory(|_| ColorPanel), AutoBind::default())
            .unwrap_err();
        assert_eq!(
            err,
            LoaderError::DuplicateRegistration {
                name: "color-panel".into(),
            }
        );

        assert_eq!(registry.len(), 1);
        let def = registry.get("color-panel").unwrap();
        assert_eq!(def.auto_bind(), &AutoBind::dialog());
        assert_eq!(def.instance_count(), 1);
    }

    #[test]
    fn test_missing_registration() {
        let registry = DefinitionRegistry::new();
        assert_eq!(
            registry.record_instance_attached("ghost"),
            Err(LoaderError::MissingRegistration {
                name: "ghost".into(),
            })
        );
        assert!(registry.record_instance_created("ghost").is_err());
    }

    #[test]
    fn test_all_attached_needs_every_type() {
        let registry = DefinitionRegistry::new();
        registry
            .register::<ColorPanel>(factory(|_| ColorPanel), AutoBind::default())
            .unwrap();
        registry
            .register::<NameSpan>(factory(|_| NameSpan), AutoBind::default())
            .unwrap();
        let seen = events(&registry);

        let id = registry.record_instance_created("color-panel").unwrap();
        assert_eq!(id.to_string(), "color-panel-1");
        registry.record_instance_created("name-span").unwrap();

        // color-panel reaches equality but name-span is still pending
        assert_eq!(registry.record_instance_attached("color-panel"), Ok(false));
        assert!(!registry.is_all_attached());

        assert_eq!(registry.record_instance_attached("name-span"), Ok(true));
        assert!(registry.is_all_attached());

        let all = seen
            .borrow()
            .iter()
            .filter(|e| **e == RegistryEvent::AllAttached)
            .count();
        assert_eq!(all, 1);
    }

    #[test]
    fn test_excess_attach_rejected() {
        let registry = DefinitionRegistry::new();
        registry
            .register::<NameSpan>(factory(|_| NameSpan), AutoBind::default())
            .unwrap();
        registry.record_instance_created("name-span").unwrap();
        registry.record_instance_attached("name-span").unwrap();

        assert_eq!(
            registry.record_instance_attached("name-span"),
            Err(LoaderError::ExcessAttach {
                name: "name-span".into(),
            })
        );
        assert_eq!(registry.get("name-span").unwrap().attached_count(), 1);
    }

    #[test]
    fn test_instantiate_creates_child_node() {
        let registry = DefinitionRegistry::new();
        registry
            .register::<ColorPanel>(factory(|_| ColorPanel), AutoBind::default())
            .unwrap();
        let root = CompletionNode::new_root();

        let component = registry
            .instantiate("color-panel", &QueryParams::new(), &root)
            .unwrap();
        assert_eq!(component.name(), "color-panel");
        assert_eq!(root.child_count(), 1);
        assert!(root.children()[0].ptr_eq(component.node()));
        assert_eq!(registry.get("color-panel").unwrap().instance_count(), 1);
    }

    #[test]
    fn test_unsubscribe_and_reset() {
        let registry = DefinitionRegistry::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        let cleanup = registry.subscribe(move |_| *seen_clone.borrow_mut() += 1);

        registry
            .register::<ColorPanel>(factory(|_| ColorPanel), AutoBind::default())
            .unwrap();
        assert_eq!(*seen.borrow(), 1);

        cleanup();
        registry
            .register::<NameSpan>(factory(|_| NameSpan), AutoBind::default())
            .unwrap();
        assert_eq!(*seen.borrow(), 1);

        registry.reset();
        assert!(registry.is_empty());
        // Names are free again after reset
        let again = registry.register::<ColorPanel>(factory(|_| ColorPanel), AutoBind::default());
        assert!(again.is_ok());
    }
}
