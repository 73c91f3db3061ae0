//! Page Pipeline
//!
//! This module connects the engine to the page and its environment.
//!
//! # Pipeline Architecture
//!
//! ```text
//! construct → registry count → host attach signal → completion tree + registry
//!           → all attached → PageLoader tier (loaded / new content) → listeners, host
//! ```
//!
//! ## Pieces
//!
//! 1. **host** - `PageHost` trait: binding activation, stylesheets, location, history
//! 2. **mount** - `PageLoader`: root binding, auto-bind collections, readiness tiers,
//!    navigation dispatch
//!
//! ## Key Design Principles
//!
//! - **Single barrier**: only the registry's all-attached event raises a tier
//! - **Side effects at the edge**: the loader never touches a document, only the host

pub mod host;
pub mod mount;

// Re-exports
pub use host::{HeadlessHost, HistoryEntry, Location, PageHost};
pub use mount::{LoadedCallback, LoaderOptions, PageLoader, StaticModule};
