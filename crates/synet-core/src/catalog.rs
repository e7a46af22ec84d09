//! Model catalog.
//!
//! Registry for every model kind, plus the type-alias table used to decide
//! port compatibility. The catalog is read-mostly: registration happens while
//! the upstream loader runs, lookups happen throughout planning. It is passed
//! explicitly into resolution and instantiation; there is no process-wide
//! registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::NameResolutionError;
use crate::types::{
    ComponentModel, CompositionModel, DataServiceModel, DeploymentModel, ModelRef,
    TaskContextModel,
};

type CatalogResult<T> = Result<T, NameResolutionError>;

/// Registry of task, service, composition, and deployment models.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    services: DashMap<String, Arc<DataServiceModel>>,
    tasks: DashMap<String, Arc<TaskContextModel>>,
    compositions: DashMap<String, Arc<CompositionModel>>,
    deployments: DashMap<String, Arc<DeploymentModel>>,
    /// Alias name to canonical type name.
    type_aliases: DashMap<String, String>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        ModelCatalog::default()
    }

    /// Registers a data-service model.
    ///
    /// # Errors
    ///
    /// Fails when a service with the same name is already registered.
    pub fn register_service(&self, model: Arc<DataServiceModel>) -> CatalogResult<()> {
        if self.services.contains_key(&model.name) {
            return Err(NameResolutionError::Duplicate {
                kind: "service",
                name: model.name.clone(),
            });
        }
        tracing::debug!(name = %model.name, "registered service model");
        self.services.insert(model.name.clone(), model);
        Ok(())
    }

    /// Registers a task-context model.
    pub fn register_task(&self, model: Arc<TaskContextModel>) -> CatalogResult<()> {
        if self.tasks.contains_key(&model.name) {
            return Err(NameResolutionError::Duplicate {
                kind: "task",
                name: model.name.clone(),
            });
        }
        tracing::debug!(name = %model.name, "registered task model");
        self.tasks.insert(model.name.clone(), model);
        Ok(())
    }

    /// Registers a composition model.
    pub fn register_composition(&self, model: Arc<CompositionModel>) -> CatalogResult<()> {
        if self.compositions.contains_key(&model.name) {
            return Err(NameResolutionError::Duplicate {
                kind: "composition",
                name: model.name.clone(),
            });
        }
        tracing::debug!(name = %model.name, "registered composition model");
        self.compositions.insert(model.name.clone(), model);
        Ok(())
    }

    /// Registers a deployment model.
    pub fn register_deployment(&self, model: Arc<DeploymentModel>) -> CatalogResult<()> {
        if self.deployments.contains_key(&model.name) {
            return Err(NameResolutionError::Duplicate {
                kind: "deployment",
                name: model.name.clone(),
            });
        }
        tracing::debug!(name = %model.name, "registered deployment model");
        self.deployments.insert(model.name.clone(), model);
        Ok(())
    }

    /// Registers a data-type alias.
    pub fn register_type_alias(&self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.type_aliases.insert(alias.into(), canonical.into());
    }

    /// Looks up a data-service model.
    pub fn service(&self, name: &str) -> CatalogResult<Arc<DataServiceModel>> {
        self.services
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NameResolutionError::Unknown {
                kind: "service",
                name: name.to_string(),
            })
    }

    /// Looks up a task-context model.
    pub fn task_context(&self, name: &str) -> CatalogResult<Arc<TaskContextModel>> {
        self.tasks
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NameResolutionError::Unknown {
                kind: "task",
                name: name.to_string(),
            })
    }

    /// Looks up a composition model.
    pub fn composition(&self, name: &str) -> CatalogResult<Arc<CompositionModel>> {
        self.compositions
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NameResolutionError::Unknown {
                kind: "composition",
                name: name.to_string(),
            })
    }

    /// Looks up a deployment model.
    pub fn deployment(&self, name: &str) -> CatalogResult<Arc<DeploymentModel>> {
        self.deployments
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NameResolutionError::Unknown {
                kind: "deployment",
                name: name.to_string(),
            })
    }

    /// Resolves a bare name against tasks, compositions, then services.
    pub fn model_by_name(&self, name: &str) -> CatalogResult<ModelRef> {
        if let Some(entry) = self.tasks.get(name) {
            return Ok(ModelRef::Component(ComponentModel::Task(Arc::clone(
                entry.value(),
            ))));
        }
        if let Some(entry) = self.compositions.get(name) {
            return Ok(ModelRef::Component(ComponentModel::Composition(Arc::clone(
                entry.value(),
            ))));
        }
        if let Some(entry) = self.services.get(name) {
            return Ok(ModelRef::Service(Arc::clone(entry.value())));
        }
        Err(NameResolutionError::Unknown {
            kind: "model",
            name: name.to_string(),
        })
    }

    /// Canonical form of a data-type name, following the alias table.
    pub fn canonical_type(&self, name: &str) -> String {
        let mut current = name.to_string();
        // Aliases may chain, but never loop back onto a visited name.
        let mut hops = 0;
        while let Some(target) = self.type_aliases.get(&current) {
            current = target.value().clone();
            hops += 1;
            if hops > self.type_aliases.len() {
                break;
            }
        }
        current
    }

    /// Whether two data-type names denote the same type.
    pub fn compatible_types(&self, a: &str, b: &str) -> bool {
        a == b || self.canonical_type(a) == self.canonical_type(b)
    }

    /// Number of registered models, all kinds included.
    pub fn len(&self) -> usize {
        self.services.len() + self.tasks.len() + self.compositions.len() + self.deployments.len()
    }

    /// Whether the catalog has no models.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
