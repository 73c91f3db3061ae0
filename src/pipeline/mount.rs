//! Page Loader - Root binding, readiness tiers and navigation dispatch.
//!
//! The loader is the page-level controller. It owns:
//! - The root completion node (every instance it creates hangs below it)
//! - The page status (`Loading → Loaded → AwaitingMore ⇄ NewlyLoaded`)
//! - The dialog/header/footer collections
//! - Static modules bound when the root binds
//!
//! Readiness comes from a single source: the registry's all-attached event.
//! The first one raises the loaded tier, later ones the new-content tier.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_page_loader::*;
//!
//! let registry = DefinitionRegistry::new();
//! registry.register::<TestPage>(factory(|_| TestPage::new()), AutoBind::root())?;
//!
//! let host = Rc::new(HeadlessHost::new("https://example.com/")?);
//! let loader = PageLoader::new(registry, host, LoaderOptions::default());
//! loader.on_loaded(|_| println!("page ready"));
//!
//! let page = loader.mount_root("test-page")?;
//! loader.document_ready();       // bindings activate
//! page.attached()?;              // host's attach signal: page loaded
//! ```

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::host::PageHost;
use crate::engine::{CompletionNode, Component, DefinitionRegistry, RegistryEvent};
use crate::error::{LoaderError, Result};
use crate::state::{
    AutoBindList, AutoBindSlot, NavigationOptions, PageState, PageStatus, ReadinessTier,
    merge_values, parse_query, to_location_search,
};
use crate::types::{
    AutoBindFlags, Cleanup, NavigationEvent, NavigationValues, QueryParams, ViewModel,
};

/// Callback receiving the loader when a readiness tier is raised.
pub type LoadedCallback = Rc<dyn Fn(&PageLoader)>;

// =============================================================================
// Options
// =============================================================================

/// Loader configuration.
#[derive(Clone)]
pub struct LoaderOptions {
    /// Log per-node completion diagnostics at debug instead of trace.
    pub verbose: bool,
    /// Replay URL state on first load and dispatch back/forward navigation.
    pub pop_state: bool,
    /// Message shown while loading.
    pub loading_message: String,
    /// Runs on first load instead of the root view model's `handle_on_loaded`.
    pub loaded_callback: Option<LoadedCallback>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            pop_state: false,
            loading_message: "Loading...".to_string(),
            loaded_callback: None,
        }
    }
}

impl LoaderOptions {
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn pop_state(mut self, pop_state: bool) -> Self {
        self.pop_state = pop_state;
        self
    }

    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading_message = message.into();
        self
    }

    pub fn loaded_callback(mut self, callback: impl Fn(&PageLoader) + 'static) -> Self {
        self.loaded_callback = Some(Rc::new(callback));
        self
    }
}

impl fmt::Debug for LoaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderOptions")
            .field("verbose", &self.verbose)
            .field("pop_state", &self.pop_state)
            .field("loading_message", &self.loading_message)
            .field("loaded_callback", &self.loaded_callback.is_some())
            .finish()
    }
}

// =============================================================================
// Static Modules
// =============================================================================

/// Singleton component instantiated and auto-bound when the root binds.
#[derive(Clone)]
pub struct StaticModule {
    name: String,
    instance: Rc<OnceCell<Component>>,
}

impl StaticModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instance, once the root has been bound.
    pub fn get(&self) -> Option<Component> {
        self.instance.get().cloned()
    }
}

// =============================================================================
// Loader State
// =============================================================================

struct LoaderInner {
    registry: DefinitionRegistry,
    host: Rc<dyn PageHost>,
    options: RefCell<LoaderOptions>,
    status: PageStatus,
    root_node: CompletionNode,
    root: RefCell<Option<Component>>,
    dialogs: AutoBindList,
    headers: AutoBindList,
    footers: AutoBindList,
    static_modules: RefCell<Vec<StaticModule>>,
    css_loaded: RefCell<Vec<String>>,
    document_ready: Cell<bool>,
    activated: Cell<bool>,
    loaded_listeners: RefCell<Vec<(usize, LoadedCallback)>>,
    new_content_listeners: RefCell<Vec<(usize, LoadedCallback)>>,
    next_listener_id: Cell<usize>,
    registry_subscription: RefCell<Option<Cleanup>>,
}

impl Drop for LoaderInner {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.registry_subscription.get_mut().take() {
            unsubscribe();
        }
    }
}

/// Page-level readiness controller.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PageLoader {
    inner: Rc<LoaderInner>,
}

impl PageLoader {
    /// Create a loader listening to `registry`.
    pub fn new(
        registry: DefinitionRegistry,
        host: Rc<dyn PageHost>,
        options: LoaderOptions,
    ) -> Self {
        let root_node = CompletionNode::new_root();
        root_node.set_component_name("page");
        root_node.set_verbose(options.verbose);

        let inner = Rc::new(LoaderInner {
            registry: registry.clone(),
            host,
            status: PageStatus::new(options.loading_message.clone()),
            options: RefCell::new(options),
            root_node,
            root: RefCell::new(None),
            dialogs: AutoBindList::new(AutoBindSlot::Dialog),
            headers: AutoBindList::new(AutoBindSlot::Header),
            footers: AutoBindList::new(AutoBindSlot::Footer),
            static_modules: RefCell::new(Vec::new()),
            css_loaded: RefCell::new(Vec::new()),
            document_ready: Cell::new(false),
            activated: Cell::new(false),
            loaded_listeners: RefCell::new(Vec::new()),
            new_content_listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
            registry_subscription: RefCell::new(None),
        });

        let weak: Weak<LoaderInner> = Rc::downgrade(&inner);
        let unsubscribe = registry.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                PageLoader { inner }.handle_registry_event(event);
            }
        });
        *inner.registry_subscription.borrow_mut() = Some(unsubscribe);

        Self { inner }
    }

    /// Replace the loader options.
    pub fn set_options(&self, options: LoaderOptions) -> &Self {
        self.inner.root_node.set_verbose(options.verbose);
        self.inner
            .status
            .set_loading_message(options.loading_message.clone());
        *self.inner.options.borrow_mut() = options;
        self
    }

    /// Set the first-load callback.
    pub fn set_loaded_callback(&self, callback: impl Fn(&PageLoader) + 'static) {
        self.inner.options.borrow_mut().loaded_callback = Some(Rc::new(callback));
    }

    // =========================================================================
    // Component Creation
    // =========================================================================

    /// Create a top-level instance of `name` below the page's root node.
    pub fn create_component(&self, name: &str, params: &QueryParams) -> Result<Component> {
        self.inner
            .registry
            .instantiate(name, params, &self.inner.root_node)
    }

    /// Create an instance of `name` nested in `parent`.
    ///
    /// Must happen before `parent` attaches.
    pub fn create_child(
        &self,
        parent: &Component,
        name: &str,
        params: &QueryParams,
    ) -> Result<Component> {
        self.inner.registry.instantiate(name, params, parent.node())
    }

    /// Track a programmatically constructed view model, nested in `parent` or top-level.
    pub fn adopt(
        &self,
        name: &str,
        view_model: Rc<dyn ViewModel>,
        parent: Option<&Component>,
    ) -> Result<Component> {
        let node = parent.map_or(&self.inner.root_node, |p| p.node());
        self.inner.registry.adopt(name, view_model, node)
    }

    /// Register a singleton component type bound automatically with the root.
    ///
    /// The type only needs to be registered by the time the root binds.
    pub fn register_static_module(&self, name: impl Into<String>) -> StaticModule {
        let module = StaticModule {
            name: name.into(),
            instance: Rc::new(OnceCell::new()),
        };
        self.inner.static_modules.borrow_mut().push(module.clone());
        module
    }

    // =========================================================================
    // Root Binding
    // =========================================================================

    /// Instantiate `name` with its auto-bind parameters and bind it as root.
    ///
    /// Nothing is instantiated unless the root can be bound.
    pub fn mount_root(&self, name: &str) -> Result<Component> {
        self.check_root_free()?;
        self.check_static_modules()?;

        let root = self.create_with_defaults(name)?;
        self.bind_root(root.clone())?;
        Ok(root)
    }

    /// Bind the page's root component.
    ///
    /// Binds static modules, injects stylesheets for every registered type and
    /// activates bindings once the document is ready.
    ///
    /// # Errors
    ///
    /// `RootAlreadyBound` if a root is set; the existing root stays bound.
    /// `MissingRegistration`, `UnconfiguredAutoBind` or `DuplicateAutoBind`
    /// for a static module that cannot be bound. Static modules are checked
    /// before anything changes, so a failed call leaves the loader unbound and
    /// can be retried.
    pub fn bind_root(&self, root: Component) -> Result<()> {
        self.check_root_free()?;
        self.check_static_modules()?;

        tracing::debug!(component = root.name(), "root bound");
        *self.inner.root.borrow_mut() = Some(root);

        self.bind_static_modules()?;
        self.add_css_links();

        if self.inner.document_ready.get() {
            self.activate();
        }
        Ok(())
    }

    /// The surrounding document is ready; activates bindings if a root is bound.
    pub fn document_ready(&self) {
        self.inner.document_ready.set(true);
        self.activate();
    }

    fn activate(&self) {
        if self.inner.activated.get() {
            return;
        }
        let Some(root) = self.root() else { return };

        self.inner.activated.set(true);
        tracing::debug!(component = root.name(), "applying bindings");
        self.inner.host.apply_bindings(&root);
    }

    fn check_root_free(&self) -> Result<()> {
        match self.root() {
            Some(existing) => Err(LoaderError::RootAlreadyBound {
                name: existing.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Reject any static module that `bind_static_modules` would fail on.
    fn check_static_modules(&self) -> Result<()> {
        let modules = self.inner.static_modules.borrow().clone();
        let mut pending: Vec<&str> = Vec::new();
        for module in modules.iter().filter(|m| m.instance.get().is_none()) {
            let Some(definition) = self.inner.registry.get(&module.name) else {
                return Err(LoaderError::MissingRegistration {
                    name: module.name.clone(),
                });
            };
            let Some(list) = self.slot_for(definition.auto_bind().flags) else {
                return Err(LoaderError::UnconfiguredAutoBind {
                    name: module.name.clone(),
                });
            };
            if list.contains(&module.name) || pending.contains(&module.name.as_str()) {
                return Err(LoaderError::DuplicateAutoBind {
                    name: module.name.clone(),
                    slot: list.slot(),
                });
            }
            pending.push(&module.name);
        }
        Ok(())
    }

    fn bind_static_modules(&self) -> Result<()> {
        let modules = self.inner.static_modules.borrow().clone();
        for module in modules.iter().filter(|m| m.instance.get().is_none()) {
            let component = self.create_with_defaults(&module.name)?;
            let _ = module.instance.set(component.clone());
            self.bind(component)?;
        }
        Ok(())
    }

    /// Create a top-level instance with the type's auto-bind parameters.
    fn create_with_defaults(&self, name: &str) -> Result<Component> {
        let params = self
            .inner
            .registry
            .get(name)
            .map(|definition| definition.auto_bind().params.clone())
            .unwrap_or_default();
        self.create_component(name, &params)
    }

    fn add_css_links(&self) {
        for definition in self.inner.registry.definitions() {
            for href in &definition.auto_bind().css {
                let mut loaded = self.inner.css_loaded.borrow_mut();
                if loaded.contains(href) {
                    continue;
                }
                loaded.push(href.clone());
                drop(loaded);
                self.inner.host.add_stylesheet(href);
            }
        }
    }

    // =========================================================================
    // Auto-bind Collections
    // =========================================================================

    /// Add `component` to the collection its auto-bind flags select.
    ///
    /// # Errors
    ///
    /// `UnconfiguredAutoBind` without a dialog, header or footer flag;
    /// `DuplicateAutoBind` if the type is already in that collection.
    pub fn bind(&self, component: Component) -> Result<Component> {
        let Some(list) = self.slot_for(component.auto_bind().flags) else {
            return Err(LoaderError::UnconfiguredAutoBind {
                name: component.name().to_string(),
            });
        };
        list.insert(component.clone())?;
        Ok(component)
    }

    /// Collection selected by the first of `DIALOG`, `HEADER`, `FOOTER` set.
    fn slot_for(&self, flags: AutoBindFlags) -> Option<&AutoBindList> {
        if flags.contains(AutoBindFlags::DIALOG) {
            Some(&self.inner.dialogs)
        } else if flags.contains(AutoBindFlags::HEADER) {
            Some(&self.inner.headers)
        } else if flags.contains(AutoBindFlags::FOOTER) {
            Some(&self.inner.footers)
        } else {
            None
        }
    }

    pub fn add_dialog(&self, component: Component) -> Result<()> {
        self.inner.dialogs.insert(component)
    }

    pub fn add_header(&self, component: Component) -> Result<()> {
        self.inner.headers.insert(component)
    }

    pub fn add_footer(&self, component: Component) -> Result<()> {
        self.inner.footers.insert(component)
    }

    // =========================================================================
    // Readiness
    // =========================================================================

    /// Subscribe to the first-load tier.
    ///
    /// Returns cleanup function to unsubscribe.
    pub fn on_loaded(&self, callback: impl Fn(&PageLoader) + 'static) -> Cleanup {
        self.add_listener(ReadinessTier::FirstLoad, Rc::new(callback))
    }

    /// Subscribe to the new-content tier (every completion after the first).
    pub fn on_new_content_loaded(&self, callback: impl Fn(&PageLoader) + 'static) -> Cleanup {
        self.add_listener(ReadinessTier::NewContent, Rc::new(callback))
    }

    fn listeners(
        inner: &LoaderInner,
        tier: ReadinessTier,
    ) -> &RefCell<Vec<(usize, LoadedCallback)>> {
        match tier {
            ReadinessTier::FirstLoad => &inner.loaded_listeners,
            ReadinessTier::NewContent => &inner.new_content_listeners,
        }
    }

    fn add_listener(&self, tier: ReadinessTier, callback: LoadedCallback) -> Cleanup {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        Self::listeners(&self.inner, tier)
            .borrow_mut()
            .push((id, callback));

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::listeners(&inner, tier)
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    fn fire(&self, tier: ReadinessTier) {
        let callbacks: Vec<LoadedCallback> = Self::listeners(&self.inner, tier)
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(self);
        }
    }

    fn handle_registry_event(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::InstanceCreated { .. } => self.inner.status.instance_created(),
            RegistryEvent::AllAttached => match self.inner.status.all_attached() {
                Some(ReadinessTier::FirstLoad) => self.do_loaded(),
                Some(ReadinessTier::NewContent) => {
                    tracing::info!("new content loaded");
                    self.fire(ReadinessTier::NewContent);
                }
                None => {}
            },
            RegistryEvent::Registered { .. } => {}
        }
    }

    fn do_loaded(&self) {
        tracing::info!("page ready");

        let loaded_callback = self.inner.options.borrow().loaded_callback.clone();
        match loaded_callback {
            Some(callback) => callback(self),
            None => {
                if let Some(root) = self.root() {
                    root.view_model().handle_on_loaded(self);
                }
            }
        }

        self.fire(ReadinessTier::FirstLoad);
        self.inner.host.notify_render();
        tracing::info!("page loaded");

        if self.inner.options.borrow().pop_state {
            let params = parse_query(&self.inner.host.location().search);
            self.dispatch_navigation_event(None, &params);
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Merge `values` into the current query and write a history entry.
    ///
    /// # Returns
    ///
    /// The URL written.
    pub fn push_navigation_state(
        &self,
        values: &NavigationValues,
        options: &NavigationOptions,
    ) -> String {
        let location = self.inner.host.location();
        let search = match &options.location_search {
            Some(search) => search.clone(),
            None => to_location_search(&merge_values(parse_query(&location.search), values)),
        };
        let url = location.with_search(&search);

        if options.replace_state {
            self.inner.host.replace_state(&url);
        } else {
            self.inner.host.push_state(&url);
        }
        url
    }

    /// Current location's query parameters.
    pub fn query_params(&self) -> QueryParams {
        parse_query(&self.inner.host.location().search)
    }

    /// Back/forward navigation from the host.
    ///
    /// Ignored unless `pop_state` is enabled and the page has loaded.
    pub fn handle_pop_state(&self, event: &NavigationEvent) {
        if !self.inner.options.borrow().pop_state || self.inner.status.state().is_loading() {
            return;
        }
        let params = self.query_params();
        self.dispatch_navigation_event(Some(event), &params);
    }

    /// Walk the completion tree depth-first, calling each attached instance's
    /// navigation handler before descending into its children.
    pub fn dispatch_navigation_event(&self, event: Option<&NavigationEvent>, params: &QueryParams) {
        fn walk(node: &CompletionNode, event: Option<&NavigationEvent>, params: &QueryParams) {
            for child in node.children() {
                if let Some(instance) = child.instance() {
                    instance.handle_pop_state(event, params);
                }
                walk(&child, event, params);
            }
        }
        walk(&self.inner.root_node, event, params);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.inner.registry
    }

    pub fn root(&self) -> Option<Component> {
        self.inner.root.borrow().clone()
    }

    pub fn root_node(&self) -> &CompletionNode {
        &self.inner.root_node
    }

    pub fn status(&self) -> &PageStatus {
        &self.inner.status
    }

    pub fn state(&self) -> PageState {
        self.inner.status.state()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.status.is_loading()
    }

    pub fn is_activated(&self) -> bool {
        self.inner.activated.get()
    }

    pub fn dialogs(&self) -> &AutoBindList {
        &self.inner.dialogs
    }

    pub fn headers(&self) -> &AutoBindList {
        &self.inner.headers
    }

    pub fn footers(&self) -> &AutoBindList {
        &self.inner.footers
    }
}

impl fmt::Debug for PageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageLoader")
            .field("state", &self.state())
            .field("root", &self.root().map(|r| r.id().to_string()))
            .field("dialogs", &self.inner.dialogs.names())
            .field("headers", &self.inner.headers.names())
            .field("footers", &self.inner.footers.names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
