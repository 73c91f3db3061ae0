//! State Module - Page-level runtime state
//!
//! This module contains the reactive state the page loader exposes:
//!
//! - **Page** - Readiness state machine, loading flag and message
//! - **Auto-bind** - Ordered dialog/header/footer collections
//! - **Navigation** - Query string parse/merge/serialize

mod auto_bind;
mod navigation;
mod page;

pub use auto_bind::*;
pub use navigation::*;
pub use page::*;
