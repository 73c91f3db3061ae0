//! End-to-end page lifecycle: registration, nested instantiation, attach
//! ordering, readiness tiers and navigation dispatch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_page_loader::{
    AutoBind, Component, DefinitionRegistry, HeadlessHost, LoaderOptions, NavigationEvent,
    NavigationOptions, NavigationValues, PageLoader, PageState, QueryParams, ViewModel, factory,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Leaf;
impl ViewModel for Leaf {}

/// Records navigation handler calls into a shared log.
struct Recorder {
    label: String,
    log: Rc<RefCell<Vec<String>>>,
}

impl ViewModel for Recorder {
    fn handle_pop_state(&self, event: Option<&NavigationEvent>, params: &QueryParams) {
        let tab = params.get("tab").cloned().unwrap_or_default();
        let kind = if event.is_some() { "pop" } else { "replay" };
        self.log
            .borrow_mut()
            .push(format!("{kind}:{}:{tab}", self.label));
    }
}

struct Tiers {
    loaded: Rc<Cell<usize>>,
    new_content: Rc<Cell<usize>>,
}

fn watch(loader: &PageLoader) -> Tiers {
    let loaded = Rc::new(Cell::new(0));
    let new_content = Rc::new(Cell::new(0));
    let first = loaded.clone();
    let fresh = new_content.clone();
    // Subscriptions live as long as the loader
    let _ = loader.on_loaded(move |_| first.set(first.get() + 1));
    let _ = loader.on_new_content_loaded(move |_| fresh.set(fresh.get() + 1));
    Tiers {
        loaded,
        new_content,
    }
}

fn new_loader(
    registry: DefinitionRegistry,
    options: LoaderOptions,
) -> (PageLoader, Rc<HeadlessHost>) {
    let host = HeadlessHost::new("https://example.com/app?tab=summary").unwrap();
    let host = Rc::new(host);
    let loader = PageLoader::new(registry, host.clone(), options);
    (loader, host)
}

fn leaf_type(registry: &DefinitionRegistry, name: &str, auto_bind: AutoBind) {
    registry
        .register_type(name, factory(|_| Leaf), auto_bind)
        .unwrap();
}

fn recorder_type(registry: &DefinitionRegistry, label: &str, log: &Rc<RefCell<Vec<String>>>) {
    let log = log.clone();
    let owned = label.to_string();
    let build = factory(move |_| Recorder {
        label: owned.clone(),
        log: log.clone(),
    });
    registry
        .register_type(label, build, AutoBind::default())
        .unwrap();
}

fn top(loader: &PageLoader, name: &str) -> Component {
    loader.create_component(name, &QueryParams::new()).unwrap()
}

fn nested(loader: &PageLoader, parent: &Component, name: &str) -> Component {
    loader
        .create_child(parent, name, &QueryParams::new())
        .unwrap()
}

#[test]
fn test_nested_completion_fires_at_parent_attach() {
    init_tracing();

    let registry = DefinitionRegistry::new();
    leaf_type(&registry, "a", AutoBind::default());
    leaf_type(&registry, "b", AutoBind::default());
    let (loader, _host) = new_loader(registry, LoaderOptions::default());
    let tiers = watch(&loader);

    let b = top(&loader, "b");
    let a = nested(&loader, &b, "a");

    assert_eq!(a.attached(), Ok(false));
    assert_eq!(tiers.loaded.get(), 0);
    assert!(loader.is_loading());
    assert!(a.node().is_completed());
    assert!(!b.node().is_completed());

    assert_eq!(b.attached(), Ok(true));
    assert_eq!(tiers.loaded.get(), 1);
    assert_eq!(tiers.new_content.get(), 0);
    assert!(b.node().is_completed());
    assert_eq!(loader.state(), PageState::Loaded);
}

#[test]
fn test_late_type_raises_new_content_not_loaded() {
    init_tracing();

    let registry = DefinitionRegistry::new();
    leaf_type(&registry, "page-body", AutoBind::root());
    let (loader, _host) = new_loader(registry.clone(), LoaderOptions::default());
    let tiers = watch(&loader);

    let body = loader.mount_root("page-body").unwrap();
    body.attached().unwrap();
    assert_eq!(tiers.loaded.get(), 1);

    leaf_type(&registry, "c", AutoBind::default());
    let c = top(&loader, "c");
    assert_eq!(loader.state(), PageState::AwaitingMore);
    assert!(!loader.is_loading());

    c.attached().unwrap();
    assert_eq!(tiers.loaded.get(), 1);
    assert_eq!(tiers.new_content.get(), 1);
    assert_eq!(loader.state(), PageState::NewlyLoaded);

    // A second late batch re-arms the new-content tier
    let c2 = top(&loader, "c");
    c2.attached().unwrap();
    assert_eq!(tiers.new_content.get(), 2);
    assert_eq!(tiers.loaded.get(), 1);
}

#[test]
fn test_any_attach_order_loads_once() {
    init_tracing();

    // Index 0 is the parent, 1..=3 its children
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 0, 3, 2], [2, 3, 0, 1]];

    for order in orders {
        let registry = DefinitionRegistry::new();
        leaf_type(&registry, "list", AutoBind::default());
        leaf_type(&registry, "row", AutoBind::default());
        let (loader, _host) = new_loader(registry, LoaderOptions::default());
        let tiers = watch(&loader);

        let list = top(&loader, "list");
        let mut components = vec![list.clone()];
        for _ in 0..3 {
            components.push(nested(&loader, &list, "row"));
        }

        for &i in &order {
            components[i].attached().unwrap();
        }
        assert_eq!(tiers.loaded.get(), 1, "order {order:?}");
        assert!(list.node().is_completed());
    }
}

#[test]
fn test_unattached_instance_blocks_loading() {
    let registry = DefinitionRegistry::new();
    leaf_type(&registry, "panel", AutoBind::default());
    let (loader, _host) = new_loader(registry, LoaderOptions::default());
    let tiers = watch(&loader);

    let first = top(&loader, "panel");
    let _never = top(&loader, "panel");

    first.attached().unwrap();
    assert_eq!(tiers.loaded.get(), 0);
    assert!(loader.is_loading());
}

#[test]
fn test_disposed_child_does_not_hold_back_parent() {
    let registry = DefinitionRegistry::new();
    leaf_type(&registry, "form", AutoBind::default());
    leaf_type(&registry, "field", AutoBind::default());
    let (loader, _host) = new_loader(registry, LoaderOptions::default());
    let tiers = watch(&loader);

    let form = top(&loader, "form");
    let field = nested(&loader, &form, "field");
    field.dispose();

    field.attached().unwrap();
    form.attached().unwrap();
    assert_eq!(tiers.loaded.get(), 1);
    assert_eq!(loader.state(), PageState::Loaded);
    // The tree agrees with the registry
    assert!(form.node().is_completed());
    assert_eq!(form.node().child_count(), 0);
}

#[test]
fn test_loaded_callback_replaces_root_hook() {
    struct Root {
        hooked: Rc<Cell<bool>>,
    }
    impl ViewModel for Root {
        fn handle_on_loaded(&self, _loader: &PageLoader) {
            self.hooked.set(true);
        }
    }

    fn root_type(registry: &DefinitionRegistry, hooked: &Rc<Cell<bool>>) {
        let hooked = hooked.clone();
        let build = factory(move |_| Root {
            hooked: hooked.clone(),
        });
        registry
            .register_type("root-page", build, AutoBind::root())
            .unwrap();
    }

    let hooked = Rc::new(Cell::new(false));
    let registry = DefinitionRegistry::new();
    root_type(&registry, &hooked);

    // Without a loaded callback the root's hook runs
    let (loader, _host) = new_loader(registry.clone(), LoaderOptions::default());
    loader.mount_root("root-page").unwrap().attached().unwrap();
    assert!(hooked.get());

    // With one, it replaces the hook
    hooked.set(false);
    registry.reset();
    root_type(&registry, &hooked);
    let called = Rc::new(Cell::new(false));
    let called_clone = called.clone();
    let options = LoaderOptions::default().loaded_callback(move |loader| {
        assert!(!loader.is_loading());
        called_clone.set(true);
    });
    let (loader, _host) = new_loader(registry, options);
    loader.mount_root("root-page").unwrap().attached().unwrap();
    assert!(called.get());
    assert!(!hooked.get());
}

#[test]
fn test_navigation_dispatch_parent_before_child() {
    init_tracing();

    let log = Rc::new(RefCell::new(Vec::new()));
    let registry = DefinitionRegistry::new();
    for label in ["shell", "tabs", "tab-body", "sidebar"] {
        recorder_type(&registry, label, &log);
    }

    let options = LoaderOptions::default().pop_state(true);
    let (loader, host) = new_loader(registry, options);

    // shell -> [tabs -> [tab-body], sidebar]
    let shell = top(&loader, "shell");
    let tabs = nested(&loader, &shell, "tabs");
    let body = nested(&loader, &tabs, "tab-body");
    let sidebar = nested(&loader, &shell, "sidebar");

    // Pop-state before loading is ignored
    loader.handle_pop_state(&NavigationEvent::new("tab=early"));
    assert!(log.borrow().is_empty());

    for component in [&body, &sidebar, &tabs, &shell] {
        component.attached().unwrap();
    }

    // First load replays the URL state
    assert_eq!(
        *log.borrow(),
        [
            "replay:shell:summary",
            "replay:tabs:summary",
            "replay:tab-body:summary",
            "replay:sidebar:summary",
        ]
    );

    log.borrow_mut().clear();
    host.navigate("https://example.com/app?tab=details").unwrap();
    loader.handle_pop_state(&NavigationEvent::new("tab=details"));
    assert_eq!(
        *log.borrow(),
        [
            "pop:shell:details",
            "pop:tabs:details",
            "pop:tab-body:details",
            "pop:sidebar:details",
        ]
    );
}

#[test]
fn test_navigation_skips_unattached_instances() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let registry = DefinitionRegistry::new();
    for label in ["outer", "inner"] {
        recorder_type(&registry, label, &log);
    }
    let (loader, _host) = new_loader(registry, LoaderOptions::default());

    let outer = top(&loader, "outer");
    let inner = nested(&loader, &outer, "inner");
    inner.attached().unwrap();

    // outer has not attached: skipped, but its attached child is still reached
    loader.dispatch_navigation_event(None, &loader.query_params());
    assert_eq!(*log.borrow(), ["replay:inner:summary"]);
}

#[test]
fn test_push_state_round_trip() {
    let registry = DefinitionRegistry::new();
    let (loader, host) = new_loader(registry, LoaderOptions::default());

    let mut values = NavigationValues::new();
    values.insert("tab".into(), Some("orders".into()));
    values.insert("q".into(), Some("red shoes".into()));
    loader.push_navigation_state(&values, &NavigationOptions::default());

    let params = loader.query_params();
    assert_eq!(params.get("tab").map(String::as_str), Some("orders"));
    assert_eq!(params.get("q").map(String::as_str), Some("red shoes"));

    let mut values = NavigationValues::new();
    values.insert("tab".into(), None);
    values.insert("q".into(), None);
    let url = loader.push_navigation_state(&values, &NavigationOptions::replace());
    assert_eq!(url, "https://example.com/app");
    assert_eq!(host.history().len(), 2);
}
