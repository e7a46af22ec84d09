//! Selection resolution errors.
//!
//! Raised while normalizing, resolving, or merging dependency-injection
//! selections. All of them are surfaced before any plan mutation happens.

use thiserror::Error;

use crate::error::NameResolutionError;

/// Errors raised by selection resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// A selection pair does not fall into any allowed category, or violates
    /// the key's constraints.
    #[error("invalid selection for {key}: {reason}")]
    InvalidSelection {
        /// Rendered selection key.
        key: String,
        /// Why the selection is invalid.
        reason: String,
    },

    /// A component provides more than one service matching the requested one.
    #[error(
        "selecting {component} for {service} is ambiguous: it provides {} matching services ({})",
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousService {
        /// The component the selection points at.
        component: String,
        /// The service being selected.
        service: String,
        /// Names of the matching provided services.
        candidates: Vec<String>,
    },

    /// A selection chain loops back on itself.
    #[error("recursive selection: {}", .chain.join(" -> "))]
    RecursiveSelection {
        /// The keys along the detected cycle.
        chain: Vec<String>,
    },

    /// Two concrete component classes unrelated by subtyping were requested
    /// for the same placeholder.
    #[error("incompatible component models: {first} and {second} are unrelated")]
    IncompatibleComponentModels {
        /// First component class.
        first: String,
        /// Second component class.
        second: String,
    },

    /// Two explicit selections for the same key cannot be reconciled.
    #[error("incompatible selections for {key}: {first} vs {second}")]
    IncompatibleSelections {
        /// Rendered selection key.
        key: String,
        /// First selection.
        first: String,
        /// Second selection.
        second: String,
    },

    /// A selection referenced a name unknown to the catalog.
    #[error(transparent)]
    Name(#[from] NameResolutionError),
}
