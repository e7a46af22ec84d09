//! Synet Inject - instance requirements and dependency injection.
//!
//! An [`InstanceRequirements`] accumulates everything known about a single
//! placeholder: required models, argument values, nested selections, and
//! deployment constraints. A [`DependencyInjection`] maps selection keys
//! (names or models) to selections and resolves them down to concrete
//! component models, synthesizing proxy models where nothing concrete was
//! picked.

pub mod defaults;
pub mod di;
pub mod requirements;

pub use defaults::DefaultResolution;
pub use di::{ComponentSelection, DependencyInjection, Selection, SelectionKey};
pub use requirements::InstanceRequirements;
