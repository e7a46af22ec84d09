//! Model descriptor records.
//!
//! The upstream loader hands the catalog a set of `(name, descriptor)`
//! records; parsing the files they come from is not this crate's concern.
//! Records reference other models by name. `load_records` ingests them with
//! repeated passes so the caller does not have to topologically sort its
//! input; references that never resolve fail with the underlying lookup
//! error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::ModelCatalog;
use crate::error::NameResolutionError;
use crate::types::{
    ArgumentSpec, ChildConnection, ChildSpec, CompositionModel, ConnectionPolicy,
    DataServiceModel, DeploymentModel, ExportedPort, ModelRef, Port, PortDirection,
    ProvidedService, Specialization, TaskContextModel, Value,
};

fn default_true() -> bool {
    true
}

/// Reference to a service fulfilled by a model, with optional port renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRecord {
    /// Name of the fulfilled service.
    pub service: String,
    /// Service port name to provider port name.
    #[serde(default)]
    pub port_mappings: BTreeMap<String, String>,
}

/// One declared argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentRecord {
    /// Argument name.
    pub name: String,
    /// Whether instantiation requires a value.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Default value, if any.
    #[serde(default)]
    pub default: Option<Value>,
}

/// One child slot of a composition descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRecord {
    /// Child name.
    pub name: String,
    /// Names of models the child must fulfill.
    pub models: Vec<String>,
    /// Whether the child may be dropped when left abstract.
    #[serde(default)]
    pub optional: bool,
}

/// One explicit connection of a composition descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Source child name.
    pub from_child: String,
    /// Source port name.
    pub from_port: String,
    /// Sink child name.
    pub to_child: String,
    /// Sink port name.
    pub to_port: String,
    /// Buffering policy for the connection.
    #[serde(default)]
    pub policy: ConnectionPolicy,
}

/// One exported port of a composition descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Port name on the composition.
    pub name: String,
    /// Direction seen from the composition.
    pub direction: PortDirection,
    /// Child owning the forwarded port.
    pub child: String,
    /// Port name on the child.
    pub child_port: String,
}

/// One specialization table entry of a composition descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecializationRecord {
    /// Child name to names of models the selection must fulfill.
    pub constraints: BTreeMap<String, Vec<String>>,
    /// Name of the specialized composition.
    pub target: String,
}

/// One slot of a deployment descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Slot name.
    pub name: String,
    /// Name of the task model deployed in the slot.
    pub task_model: String,
}

/// A model descriptor as supplied by the upstream loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelRecord {
    /// A data-service model.
    DataService {
        /// Service name.
        name: String,
        /// Ports promised by the service.
        #[serde(default)]
        ports: Vec<Port>,
        /// Parent services this one refines.
        #[serde(default)]
        fulfills: Vec<ProvisionRecord>,
    },
    /// A task-context model.
    TaskContext {
        /// Task model name.
        name: String,
        /// Parent task model name.
        #[serde(default)]
        supermodel: Option<String>,
        /// Declared ports.
        #[serde(default)]
        ports: Vec<Port>,
        /// Declared arguments.
        #[serde(default)]
        arguments: Vec<ArgumentRecord>,
        /// Fulfilled services.
        #[serde(default)]
        provides: Vec<ProvisionRecord>,
    },
    /// A composition model.
    Composition {
        /// Composition name.
        name: String,
        /// Services provided by the composition.
        #[serde(default)]
        provides: Vec<ProvisionRecord>,
        /// Children.
        #[serde(default)]
        children: Vec<ChildRecord>,
        /// Explicit connections.
        #[serde(default)]
        connections: Vec<ConnectionRecord>,
        /// Exported ports.
        #[serde(default)]
        exports: Vec<ExportRecord>,
        /// Specialization table.
        #[serde(default)]
        specializations: Vec<SpecializationRecord>,
    },
    /// A deployment model.
    Deployment {
        /// Deployment name.
        name: String,
        /// Slots.
        #[serde(default)]
        slots: Vec<SlotRecord>,
    },
    /// A data-type alias.
    TypeAlias {
        /// Alias name.
        alias: String,
        /// Canonical name.
        canonical: String,
    },
}

impl ModelRecord {
    fn name(&self) -> &str {
        match self {
            ModelRecord::DataService { name, .. }
            | ModelRecord::TaskContext { name, .. }
            | ModelRecord::Composition { name, .. }
            | ModelRecord::Deployment { name, .. } => name,
            ModelRecord::TypeAlias { alias, .. } => alias,
        }
    }
}

impl ModelCatalog {
    /// Ingests a batch of descriptor records.
    ///
    /// Records may reference each other in any order; ingestion retries until
    /// a full pass makes no progress.
    ///
    /// # Errors
    ///
    /// Fails with the first unresolved reference once no further record can
    /// be ingested, or with a duplicate-name error.
    pub fn load_records(&self, records: Vec<ModelRecord>) -> Result<(), NameResolutionError> {
        let mut pending = records;
        while !pending.is_empty() {
            let mut next = Vec::new();
            let mut first_error = None;
            let pending_len = pending.len();
            for record in pending {
                match self.ingest(&record) {
                    Ok(()) => {}
                    Err(err @ NameResolutionError::Duplicate { .. }) => return Err(err),
                    Err(err) => {
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                        next.push(record);
                    }
                }
            }
            if next.len() == pending_len {
                // No record could be ingested this pass.
                return Err(first_error.unwrap_or(NameResolutionError::Unknown {
                    kind: "model",
                    name: next[0].name().to_string(),
                }));
            }
            pending = next;
        }
        Ok(())
    }

    fn resolve_provisions(
        &self,
        records: &[ProvisionRecord],
    ) -> Result<Vec<ProvidedService>, NameResolutionError> {
        records
            .iter()
            .map(|r| {
                Ok(ProvidedService {
                    service: self.service(&r.service)?,
                    port_mappings: r.port_mappings.clone(),
                })
            })
            .collect()
    }

    fn resolve_model_names(&self, names: &[String]) -> Result<Vec<ModelRef>, NameResolutionError> {
        names.iter().map(|n| self.model_by_name(n)).collect()
    }

    fn ingest(&self, record: &ModelRecord) -> Result<(), NameResolutionError> {
        match record {
            ModelRecord::DataService {
                name,
                ports,
                fulfills,
            } => {
                let parents = self.resolve_provisions(fulfills)?;
                self.register_service(Arc::new(DataServiceModel {
                    name: name.clone(),
                    ports: ports.clone(),
                    parents,
                }))
            }
            ModelRecord::TaskContext {
                name,
                supermodel,
                ports,
                arguments,
                provides,
            } => {
                let supermodel = supermodel
                    .as_deref()
                    .map(|n| self.task_context(n))
                    .transpose()?;
                let provides = self.resolve_provisions(provides)?;
                self.register_task(Arc::new(TaskContextModel {
                    name: name.clone(),
                    supermodel,
                    ports: ports.clone(),
                    arguments: arguments
                        .iter()
                        .map(|a| ArgumentSpec {
                            name: a.name.clone(),
                            required: a.required && a.default.is_none(),
                            default: a.default.clone(),
                        })
                        .collect(),
                    provides,
                }))
            }
            ModelRecord::Composition {
                name,
                provides,
                children,
                connections,
                exports,
                specializations,
            } => {
                let provides = self.resolve_provisions(provides)?;
                let mut child_specs = BTreeMap::new();
                for child in children {
                    child_specs.insert(
                        child.name.clone(),
                        ChildSpec {
                            models: self.resolve_model_names(&child.models)?,
                            optional: child.optional,
                        },
                    );
                }
                let mut conn_map: Vec<ChildConnection> = Vec::new();
                for c in connections {
                    let existing = conn_map
                        .iter_mut()
                        .find(|e| e.from_child == c.from_child && e.to_child == c.to_child);
                    let ports_key = (c.from_port.clone(), c.to_port.clone());
                    match existing {
                        Some(entry) => {
                            entry.ports.insert(ports_key, c.policy);
                        }
                        None => conn_map.push(ChildConnection {
                            from_child: c.from_child.clone(),
                            to_child: c.to_child.clone(),
                            ports: BTreeMap::from([(ports_key, c.policy)]),
                        }),
                    }
                }
                let mut spec_table = Vec::new();
                for s in specializations {
                    let mut constraints = BTreeMap::new();
                    for (child, models) in &s.constraints {
                        constraints.insert(child.clone(), self.resolve_model_names(models)?);
                    }
                    spec_table.push(Specialization {
                        constraints,
                        target: s.target.clone(),
                    });
                }
                self.register_composition(Arc::new(CompositionModel {
                    name: name.clone(),
                    provides,
                    children: child_specs,
                    connections: conn_map,
                    exports: exports
                        .iter()
                        .map(|e| ExportedPort {
                            name: e.name.clone(),
                            direction: e.direction,
                            child: e.child.clone(),
                            child_port: e.child_port.clone(),
                        })
                        .collect(),
                    specializations: spec_table,
                }))
            }
            ModelRecord::Deployment { name, slots } => {
                let mut slot_map = BTreeMap::new();
                for slot in slots {
                    slot_map.insert(slot.name.clone(), self.task_context(&slot.task_model)?);
                }
                self.register_deployment(Arc::new(DeploymentModel {
                    name: name.clone(),
                    slots: slot_map,
                }))
            }
            ModelRecord::TypeAlias { alias, canonical } => {
                self.register_type_alias(alias.clone(), canonical.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_records_out_of_order() {
        let json = r#"[
            { "kind": "task_context", "name": "Imu",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }],
              "provides": [{ "service": "imu_source" }] },
            { "kind": "data_service", "name": "imu_source",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }] }
        ]"#;
        let records: Vec<ModelRecord> = serde_json::from_str(json).unwrap();
        let catalog = ModelCatalog::new();
        catalog.load_records(records).unwrap();

        let task = catalog.task_context("Imu").unwrap();
        assert_eq!(task.provides.len(), 1);
        assert_eq!(task.provides[0].service.name, "imu_source");
    }

    #[test]
    fn test_unresolvable_reference_fails() {
        let json = r#"[
            { "kind": "task_context", "name": "Imu",
              "provides": [{ "service": "never_defined" }] }
        ]"#;
        let records: Vec<ModelRecord> = serde_json::from_str(json).unwrap();
        let catalog = ModelCatalog::new();
        let err = catalog.load_records(records).unwrap_err();
        assert!(matches!(err, NameResolutionError::Unknown { .. }));
    }

    #[test]
    fn test_deployment_record() {
        let json = r#"[
            { "kind": "task_context", "name": "Planner" },
            { "kind": "deployment", "name": "nav",
              "slots": [{ "name": "planner", "task_model": "Planner" }] }
        ]"#;
        let records: Vec<ModelRecord> = serde_json::from_str(json).unwrap();
        let catalog = ModelCatalog::new();
        catalog.load_records(records).unwrap();
        let nav = catalog.deployment("nav").unwrap();
        assert_eq!(nav.slots.len(), 1);
        assert_eq!(nav.slots["planner"].name, "Planner");
    }

    #[test]
    fn test_argument_with_default_is_not_required() {
        let json = r#"[
            { "kind": "task_context", "name": "Driver",
              "arguments": [
                { "name": "device" },
                { "name": "rate", "default": 100 }
              ] }
        ]"#;
        let records: Vec<ModelRecord> = serde_json::from_str(json).unwrap();
        let catalog = ModelCatalog::new();
        catalog.load_records(records).unwrap();
        let driver = catalog.task_context("Driver").unwrap();
        assert!(driver.arguments[0].required);
        assert!(!driver.arguments[1].required);
    }
}
