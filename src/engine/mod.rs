//! Loader Engine - Definitions, instances and the completion tree.
//!
//! The engine manages the core data structures:
//! - Registry: Component type table, created/attached counts, page-wide barrier
//! - Definition: One component type (factory, auto-bind settings, counters)
//! - Component: Live instance handle, receives the host's attach signal
//! - Completion: Readiness tree, one node per instance
//!
//! # Architecture
//!
//! Two views of the same instances are kept side by side:
//!
//! ```text
//! Registry (per type)           Completion tree (per instance)
//! color-panel  created=2 att=1  root
//! name-span    created=1 att=1   ├── test-page
//! test-page    created=1 att=0   │    ├── color-panel-1  (done)
//!                                │    └── color-panel-2  (waiting)
//!                                └── name-span-1         (done)
//! ```
//!
//! The registry answers "is the whole page attached"; the tree answers "is
//! this subtree attached" and gives navigation a parent-before-child walk.

mod completion;
mod component;
mod definition;
mod registry;

pub use completion::*;
pub use component::*;
pub use definition::*;
pub use registry::*;
