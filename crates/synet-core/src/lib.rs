//! Synet Core - fundamental model types for the network transformation pipeline.
//!
//! This crate provides the model catalog, the port/value primitives, the
//! `fulfills` partial order between models, and the error types that every
//! other synet crate depends on.

pub mod catalog;
pub mod descriptor;
pub mod diag;
pub mod error;
pub mod types;

pub use catalog::ModelCatalog;
pub use descriptor::ModelRecord;
pub use error::{
    DeployError, InstantiationError, InternalError, NameResolutionError, ResolutionError,
};
pub use types::{
    ArgumentSpec, ComponentModel, CompositionModel, ConnectionPolicy, DataServiceModel,
    DeploymentBinding, DeploymentGroup, DeploymentGroupEntry, DeploymentHint, DeploymentModel,
    InstanceModel, ModelRef, ModelSet, Port, PortDirection, ProvidedService, ProxyModel, TaskId,
    TaskContextModel, Value,
};
