//! Accumulated constraints for a single placeholder.

use std::collections::BTreeMap;

use synet_core::error::ResolutionError;
use synet_core::types::{DeploymentGroup, DeploymentHint, ModelRef, ModelSet, Value};

use crate::di::DependencyInjection;

/// Everything known about one placeholder before instantiation: the models it
/// must fulfill, argument values, nested selections, and deployment
/// constraints.
#[derive(Clone, Debug, Default)]
pub struct InstanceRequirements {
    /// Models the instantiated task must fulfill.
    pub models: ModelSet,
    /// Argument values, merged by key.
    pub arguments: BTreeMap<String, Value>,
    /// Selections applied when instantiating this placeholder.
    pub selections: DependencyInjection,
    /// Hints narrowing deployment candidates.
    pub hints: Vec<DeploymentHint>,
    /// Deployments this placeholder's subtree may use.
    pub deployment_group: Option<DeploymentGroup>,
    /// Fixed name on the process server, when required.
    pub runtime_name: Option<String>,
}

impl InstanceRequirements {
    /// Empty requirements.
    pub fn new() -> Self {
        InstanceRequirements::default()
    }

    /// Requirements for a single model.
    pub fn from_model(model: ModelRef) -> Self {
        let mut requirements = InstanceRequirements::new();
        // A single reference can never be inconsistent.
        requirements.models.add(model).expect("single model");
        requirements
    }

    /// Requirements for a set of model references.
    pub fn from_models(
        models: impl IntoIterator<Item = ModelRef>,
    ) -> Result<Self, ResolutionError> {
        Ok(InstanceRequirements {
            models: ModelSet::from_refs(models)?,
            ..InstanceRequirements::new()
        })
    }

    /// Sets an argument value.
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Sets the runtime name.
    pub fn with_runtime_name(mut self, name: impl Into<String>) -> Self {
        self.runtime_name = Some(name.into());
        self
    }

    /// Adds a deployment hint.
    pub fn with_hint(mut self, hint: DeploymentHint) -> Self {
        if !self.hints.contains(&hint) {
            self.hints.push(hint);
        }
        self
    }

    /// Merges `other` into this requirement set.
    ///
    /// # Errors
    ///
    /// Fails with `IncompatibleComponentModels` when the model sets cannot be
    /// united, and with `IncompatibleSelections` on argument or runtime-name
    /// conflicts.
    pub fn merge(&mut self, other: &InstanceRequirements) -> Result<(), ResolutionError> {
        self.models.merge(&other.models)?;
        for (key, value) in &other.arguments {
            if let Some(existing) = self.arguments.get(key) {
                if existing != value {
                    return Err(ResolutionError::IncompatibleSelections {
                        key: format!("argument '{key}'"),
                        first: existing.to_string(),
                        second: value.to_string(),
                    });
                }
            } else {
                self.arguments.insert(key.clone(), value.clone());
            }
        }
        match (&self.runtime_name, &other.runtime_name) {
            (Some(a), Some(b)) if a != b => {
                return Err(ResolutionError::IncompatibleSelections {
                    key: "runtime name".to_string(),
                    first: a.clone(),
                    second: b.clone(),
                });
            }
            (None, Some(b)) => self.runtime_name = Some(b.clone()),
            _ => {}
        }
        for hint in &other.hints {
            if !self.hints.contains(hint) {
                self.hints.push(hint.clone());
            }
        }
        match (&mut self.deployment_group, &other.deployment_group) {
            (Some(own), Some(theirs)) => {
                for entry in &theirs.entries {
                    own.register(entry.process_server.clone(), entry.deployment.clone());
                }
            }
            (None, Some(theirs)) => self.deployment_group = Some(theirs.clone()),
            _ => {}
        }
        self.selections = self.selections.clone().merged(&other.selections)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synet_core::types::TaskContextModel;

    fn task_ref(name: &str) -> ModelRef {
        ModelRef::task(Arc::new(TaskContextModel::new(name)))
    }

    #[test]
    fn test_merge_accumulates_arguments() {
        let mut a = InstanceRequirements::from_model(task_ref("Imu"))
            .with_argument("rate", Value::Integer(100));
        let b = InstanceRequirements::from_model(task_ref("Imu"))
            .with_argument("device", Value::from("/dev/imu"));
        a.merge(&b).unwrap();
        assert_eq!(a.arguments.len(), 2);
    }

    #[test]
    fn test_merge_detects_argument_conflict() {
        let mut a = InstanceRequirements::new().with_argument("rate", Value::Integer(100));
        let b = InstanceRequirements::new().with_argument("rate", Value::Integer(200));
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(err, ResolutionError::IncompatibleSelections { .. }));
    }

    #[test]
    fn test_merge_rejects_unrelated_components() {
        let mut a = InstanceRequirements::from_model(task_ref("Imu"));
        let b = InstanceRequirements::from_model(task_ref("Sonar"));
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::IncompatibleComponentModels { .. }
        ));
    }

    #[test]
    fn test_merge_runtime_name_conflict() {
        let mut a = InstanceRequirements::new().with_runtime_name("imu_front");
        let b = InstanceRequirements::new().with_runtime_name("imu_rear");
        assert!(a.merge(&b).is_err());
    }
}
