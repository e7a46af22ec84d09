//! Catalog name lookup errors.

use thiserror::Error;

/// Errors raised when resolving model names against the catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameResolutionError {
    /// No model of the requested kind is registered under the name.
    #[error("no {kind} model named '{name}' is registered")]
    Unknown {
        /// Model kind that was looked up.
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// A model of the same kind is already registered under the name.
    #[error("a {kind} model named '{name}' is already registered")]
    Duplicate {
        /// Model kind that was registered.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },
}
