//! Core type definitions shared across the synet crates.

mod deploy;
mod ids;
mod model;
mod model_set;
mod port;
mod value;

pub use deploy::{DeploymentBinding, DeploymentGroup, DeploymentGroupEntry, DeploymentHint};
pub use ids::TaskId;
pub use model::{
    ArgumentSpec, ChildConnection, ChildSpec, ComponentModel, CompositionModel, DataServiceModel,
    DeploymentModel, ExportedPort, InstanceModel, ModelRef, ProvidedService, ProxyModel,
    Specialization, TaskContextModel,
};
pub use model_set::ModelSet;
pub use port::{ConnectionPolicy, Port, PortDirection};
pub use value::Value;
