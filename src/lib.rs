//! # spark-page-loader
//!
//! Component lifecycle and page readiness tracking for reactive UI bindings.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for observable page state.
//!
//! ## Architecture
//!
//! A page is a tree of component instances. Some come from markup, some are
//! created in code, some arrive after the first render. The loader answers one
//! question: has everything that exists right now finished attaching?
//!
//! ```text
//! DefinitionRegistry ──(created / attached counts)──▶ PageLoader ──▶ loaded / new content
//!         │                                               │
//!         └── instantiate ──▶ Component ──▶ CompletionNode tree ──▶ navigation dispatch
//! ```
//!
//! The binding framework itself stays outside: it is reached through
//! [`PageHost`] and delivers one attach signal per component via
//! [`Component::attached`].
//!
//! ## Modules
//!
//! - [`types`] - Auto-bind settings, query parameters, view model contract, naming
//! - [`engine`] - Definition registry, components, completion tree
//! - [`state`] - Page state machine, auto-bind collections, query helpers
//! - [`pipeline`] - Page host boundary and the page loader
//! - [`error`] - Loader errors

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{LoaderError, Result};

pub use engine::{
    BindingObject, CallbackId, ChildOptions, CompletedCallback, Completion, CompletionNode,
    Component, ComponentDefinition, DefinitionRegistry, InstanceId, RegistryEvent, RegistryListener,
};

pub use state::{
    AutoBindList, AutoBindSlot, NavigationOptions, PageState, PageStatus, ReadinessTier,
    merge_values, parse_query, to_location_search, to_query_string,
};

pub use pipeline::{
    HeadlessHost, HistoryEntry, LoadedCallback, LoaderOptions, Location, PageHost, PageLoader,
    StaticModule,
};
