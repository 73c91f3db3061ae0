//! Page Host - Boundary to the binding framework and the browser.
//!
//! The loader never touches a document or history stack itself. Everything
//! outward-facing goes through [`PageHost`]:
//! - activating bindings for the root component
//! - injecting stylesheet links
//! - reading the current location and writing history entries
//! - notifying an external renderer that the page is ready
//!
//! [`HeadlessHost`] implements the trait in memory and records every call.
//! Use it for server-side harnesses and tests.

use std::cell::RefCell;

use url::Url;

use crate::engine::Component;

// =============================================================================
// Location
// =============================================================================

/// Current page location, split the way history updates need it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Scheme, host and port: `https://example.com`.
    pub origin: String,
    /// Path: `/orders/list`.
    pub pathname: String,
    /// Query including `?`, or empty.
    pub search: String,
}

impl Location {
    /// Parse an absolute URL.
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(href)?;
        Ok(Self {
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
        })
    }

    /// Full URL for this location.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.origin, self.pathname, self.search)
    }

    /// Same origin and path with a different search string.
    pub fn with_search(&self, search: &str) -> String {
        format!("{}{}{}", self.origin, self.pathname, search)
    }
}

// =============================================================================
// Host Trait
// =============================================================================

/// Services the loader needs from its environment.
pub trait PageHost {
    /// Activate the binding framework with `root` as the page's root component.
    fn apply_bindings(&self, root: &Component);

    /// Add a stylesheet link to the document head.
    fn add_stylesheet(&self, href: &str);

    /// Current location.
    fn location(&self) -> Location;

    /// Push a new history entry.
    fn push_state(&self, url: &str);

    /// Replace the current history entry.
    fn replace_state(&self, url: &str);

    /// Tell an external renderer (e.g. a PDF generator) the page is ready.
    fn notify_render(&self) {}
}

// =============================================================================
// Headless Host
// =============================================================================

/// One recorded history write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub url: String,
    pub replaced: bool,
}

#[derive(Default)]
struct HeadlessState {
    location: Location,
    bound_roots: Vec<String>,
    stylesheets: Vec<String>,
    history: Vec<HistoryEntry>,
    render_notifications: usize,
}

/// In-memory host that records what the loader asked for.
#[derive(Default)]
pub struct HeadlessHost {
    state: RefCell<HeadlessState>,
}

impl HeadlessHost {
    /// Create a host positioned at `href`.
    pub fn new(href: &str) -> Result<Self, url::ParseError> {
        let host = Self::default();
        host.state.borrow_mut().location = Location::parse(href)?;
        Ok(host)
    }

    /// Simulate the user navigating (back/forward) to `href`.
    pub fn navigate(&self, href: &str) -> Result<(), url::ParseError> {
        self.state.borrow_mut().location = Location::parse(href)?;
        Ok(())
    }

    /// Names of the roots passed to `apply_bindings`.
    pub fn bound_roots(&self) -> Vec<String> {
        self.state.borrow().bound_roots.clone()
    }

    pub fn stylesheets(&self) -> Vec<String> {
        self.state.borrow().stylesheets.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.borrow().history.clone()
    }

    pub fn render_notifications(&self) -> usize {
        self.state.borrow().render_notifications
    }

    fn write_history(&self, url: &str, replaced: bool) {
        let mut state = self.state.borrow_mut();
        match Location::parse(url) {
            Ok(location) => state.location = location,
            Err(err) => tracing::warn!(url, %err, "history url not parseable, location unchanged"),
        }
        state.history.push(HistoryEntry {
            url: url.to_string(),
            replaced,
        });
    }
}

impl PageHost for HeadlessHost {
    fn apply_bindings(&self, root: &Component) {
        self.state
            .borrow_mut()
            .bound_roots
            .push(root.name().to_string());
    }

    fn add_stylesheet(&self, href: &str) {
        self.state.borrow_mut().stylesheets.push(href.to_string());
    }

    fn location(&self) -> Location {
        self.state.borrow().location.clone()
    }

    fn push_state(&self, url: &str) {
        self.write_history(url, false);
    }

    fn replace_state(&self, url: &str) {
        self.write_history(url, true);
    }

    fn notify_render(&self) {
        self.state.borrow_mut().render_notifications += 1;
    }
}
