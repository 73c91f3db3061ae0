//! Page Example - Root page, nested panels, a static dialog and late content
//!
//! This example walks a page through its lifecycle:
//! - Registering component types (root, panel, dialog, header)
//! - Mounting the root and activating bindings on document ready
//! - Delivering attach signals in host order
//! - Adding content after the first load
//!
//! Run with: cargo run --example page

use std::rc::Rc;

use spark_page_loader::{
    AutoBind, DefinitionRegistry, HeadlessHost, LoaderOptions, NavigationEvent, PageLoader,
    QueryParams, ViewModel, factory,
};

struct TestPage;

impl ViewModel for TestPage {
    fn handle_on_loaded(&self, loader: &PageLoader) {
        let headers = loader.headers().len();
        println!("  test-page: loaded hook ({headers} headers)");
    }
}

struct ColorPanel {
    color: String,
}

impl ViewModel for ColorPanel {
    fn handle_pop_state(&self, _event: Option<&NavigationEvent>, params: &QueryParams) {
        let color = params
            .get("color")
            .map(String::as_str)
            .unwrap_or(&self.color);
        println!("  color-panel: showing {color}");
    }
}

struct NameSpan;
impl ViewModel for NameSpan {}

struct Dialog;
impl ViewModel for Dialog {}

struct SiteHeader;
impl ViewModel for SiteHeader {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("spark_page_loader=debug")
        .init();

    println!("=== spark-page-loader Page Example ===\n");

    let registry = DefinitionRegistry::new();
    registry.register::<TestPage>(factory(|_| TestPage), AutoBind::root())?;
    registry.register::<ColorPanel>(
        factory(|params| ColorPanel {
            color: params
                .get("color")
                .cloned()
                .unwrap_or_else(|| "Default Color".into()),
        }),
        AutoBind::default(),
    )?;
    registry.register::<NameSpan>(factory(|_| NameSpan), AutoBind::default())?;
    registry.register::<Dialog>(
        factory(|_| Dialog),
        AutoBind::dialog().with_css("/css/dialog.css"),
    )?;
    registry.register::<SiteHeader>(factory(|_| SiteHeader), AutoBind::header(1.0))?;

    let host = Rc::new(HeadlessHost::new("https://example.com/test?color=Blue")?);
    let options = LoaderOptions::default().pop_state(true);
    let loader = PageLoader::new(registry, host.clone(), options);
    let dialog = loader.register_static_module("dialog");

    let _loaded = loader.on_loaded(|_| println!("  >> page loaded"));
    let _more = loader.on_new_content_loaded(|_| println!("  >> new content loaded"));

    // Root and its children are created before anything attaches
    let page = loader.mount_root("test-page")?;
    let mut panel_params = QueryParams::new();
    panel_params.insert("color".into(), "Red - From Code".into());
    let panel = loader.create_child(&page, "color-panel", &panel_params)?;
    let name = loader.create_child(&page, "name-span", &QueryParams::new())?;
    let header = loader.create_component("site-header", &QueryParams::new())?;
    loader.bind(header.clone())?;

    loader.document_ready();
    println!("Bound roots: {:?}", host.bound_roots());
    println!("Stylesheets: {:?}", host.stylesheets());

    println!("\nAttaching in host order:");
    name.attached()?;
    panel.attached()?;
    header.attached()?;
    if let Some(dialog) = dialog.get() {
        dialog.attached()?;
    }
    page.attached()?;

    println!("\nLate content:");
    let late = loader.create_component("color-panel", &QueryParams::new())?;
    println!("  state: {:?}", loader.state());
    late.attached()?;
    println!("  state: {:?}", loader.state());

    Ok(())
}
