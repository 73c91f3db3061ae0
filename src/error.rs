//! Loader errors.
//!
//! Every variant is a wiring defect (registration order, duplicate binding,
//! malformed auto-bind settings). None of them are transient, so callers are
//! expected to surface them immediately rather than retry.

use crate::state::AutoBindSlot;

/// Errors raised by the registry and the page loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// A component type with this name is already registered.
    #[error("component '{name}' already registered")]
    DuplicateRegistration {
        /// Dashed component name.
        name: String,
    },

    /// The page already has a root component.
    #[error("root component already set: {name}")]
    RootAlreadyBound {
        /// Name of the root that is already bound.
        name: String,
    },

    /// A component of the same type is already bound in this collection.
    #[error("component '{name}' is already bound as a {slot}")]
    DuplicateAutoBind {
        /// Dashed component name.
        name: String,
        /// Collection that rejected the component.
        slot: AutoBindSlot,
    },

    /// An instance or attach signal referenced a type that was never registered.
    #[error("component '{name}' is not registered")]
    MissingRegistration {
        /// Dashed component name.
        name: String,
    },

    /// Global binding was requested for a type without dialog, header or footer flags.
    #[error("component '{name}' cannot bind globally; needs a dialog, header or footer flag")]
    UnconfiguredAutoBind {
        /// Dashed component name.
        name: String,
    },

    /// More attach signals than created instances were delivered for a type.
    #[error("component '{name}' received more attach signals than created instances")]
    ExcessAttach {
        /// Dashed component name.
        name: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LoaderError>;
