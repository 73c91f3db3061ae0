//! Core types for spark-page-loader.
//!
//! Shared vocabulary between the registry, the completion tree and the page
//! loader: auto-bind settings, query parameters, the view model contract and
//! the component naming rule.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::pipeline::PageLoader;

// =============================================================================
// Cleanup / Callbacks
// =============================================================================

/// Cleanup function returned by subscriptions.
///
/// Call this to unregister the listener.
pub type Cleanup = Box<dyn FnOnce()>;

/// Ordered query parameters (`key=value&...`).
pub type QueryParams = IndexMap<String, String>;

/// Query values to merge into the current location. `None` removes the key.
pub type NavigationValues = IndexMap<String, Option<String>>;

// =============================================================================
// View Model
// =============================================================================

/// Browser navigation event delivered on back/forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationEvent {
    /// Raw query string of the location navigated to (without `?`).
    pub search: String,
}

impl NavigationEvent {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
        }
    }
}

/// Instance behind a component, built by the type's factory.
///
/// Both hooks are optional; the defaults do nothing.
pub trait ViewModel {
    /// Called for back/forward navigation, parents before children.
    ///
    /// `event` is `None` when the loader replays the initial URL state.
    fn handle_pop_state(&self, _event: Option<&NavigationEvent>, _params: &QueryParams) {}

    /// Called on the root view model once the page first finishes loading,
    /// unless a loaded callback is configured on the loader.
    fn handle_on_loaded(&self, _loader: &PageLoader) {}
}

/// Builds a view model from binding parameters.
pub type ViewModelFactory = Rc<dyn Fn(&QueryParams) -> Rc<dyn ViewModel>>;

/// Wrap a constructor closure as a [`ViewModelFactory`].
///
/// ```ignore
/// let make_panel = factory(|params| ColorPanel::new(params.get("color").cloned()));
/// ```
pub fn factory<V, F>(build: F) -> ViewModelFactory
where
    V: ViewModel + 'static,
    F: Fn(&QueryParams) -> V + 'static,
{
    Rc::new(move |params: &QueryParams| -> Rc<dyn ViewModel> {
        Rc::new(build(params))
    })
}

// =============================================================================
// Auto Bind (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Page slots a component type binds into automatically.
    ///
    /// Combine with bitwise OR, although the loader only honors the first of
    /// `DIALOG`, `HEADER`, `FOOTER` (in that order).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AutoBindFlags: u8 {
        const NONE = 0;
        const ROOT = 1 << 0;
        const DIALOG = 1 << 1;
        const HEADER = 1 << 2;
        const FOOTER = 1 << 3;
    }
}

/// Declarative auto-bind settings for a component type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoBind {
    pub flags: AutoBindFlags,
    /// Ordering within headers/footers. `None` sorts first.
    pub sort_index: Option<f64>,
    /// Stylesheets injected once per page when the root binds.
    pub css: Vec<String>,
    /// Default parameters used when the loader instantiates the type.
    pub params: QueryParams,
}

impl AutoBind {
    pub fn new(flags: AutoBindFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    pub fn root() -> Self {
        Self::new(AutoBindFlags::ROOT)
    }

    pub fn dialog() -> Self {
        Self::new(AutoBindFlags::DIALOG)
    }

    pub fn header(sort_index: impl Into<Option<f64>>) -> Self {
        Self {
            sort_index: sort_index.into(),
            ..Self::new(AutoBindFlags::HEADER)
        }
    }

    pub fn footer(sort_index: impl Into<Option<f64>>) -> Self {
        Self {
            sort_index: sort_index.into(),
            ..Self::new(AutoBindFlags::FOOTER)
        }
    }

    pub fn with_css(mut self, href: impl Into<String>) -> Self {
        self.css.push(href.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// True when any page slot flag is set.
    pub fn should_auto_bind(&self) -> bool {
        let slots = AutoBindFlags::ROOT
            | AutoBindFlags::DIALOG
            | AutoBindFlags::HEADER
            | AutoBindFlags::FOOTER;
        self.flags.intersects(slots)
    }
}

// =============================================================================
// Naming
// =============================================================================

/// Derive a component name from a type identifier.
///
/// A separator is inserted before every capital that follows a letter, and
/// the result is lowercased: `ColorPanel` → `color-panel`. Identifiers shorter
/// than two characters are returned unchanged.
pub fn component_name(ident: &str) -> String {
    if ident.chars().count() < 2 {
        return ident.to_string();
    }

    let mut result = String::with_capacity(ident.len() + 4);
    let mut last: Option<char> = None;
    for ch in ident.chars() {
        if ch.is_ascii_uppercase() && last.is_some_and(|l| l.is_ascii_alphabetic()) {
            result.push('-');
        }
        result.push(ch.to_ascii_lowercase());
        last = Some(ch);
    }
    result
}

/// Component name for a Rust type, using the last path segment of its type name.
pub fn component_name_of<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let ident = base.rsplit("::").next().unwrap_or(base);
    component_name(ident)
}

// =============================================================================
// Tests
// =============================================================================
