//! Error types for the network transformation pipeline.
//!
//! Errors are grouped by the phase that raises them: name resolution against
//! the catalog, selection resolution inside the dependency injection, network
//! instantiation, and deployment binding. `InternalError` is reserved for
//! invariants that should be unreachable.
//!
//! Selection errors are raised eagerly at resolve time and never leave the
//! plan modified; passes stage their changes and commit only on success.

/// Deployment binding errors.
pub mod deploy;
/// Network instantiation errors.
pub mod instantiate;
/// Unreachable-invariant errors.
pub mod internal;
/// Catalog name lookup errors.
pub mod name;
/// Selection resolution errors.
pub mod resolve;

pub use deploy::{DeployError, DeploymentCandidate, MissingDeployment};
pub use instantiate::InstantiationError;
pub use internal::InternalError;
pub use name::NameResolutionError;
pub use resolve::ResolutionError;
