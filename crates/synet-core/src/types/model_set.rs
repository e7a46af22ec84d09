//! Consistent sets of model references.
//!
//! A `ModelSet` is the "required models" side of a placeholder: any number of
//! services plus at most one component class chain. Merging two sets keeps the
//! most derived component when the components are related by `fulfills` and
//! fails when they are not.

use std::fmt;
use std::sync::Arc;

use crate::error::ResolutionError;
use crate::types::{ComponentModel, DataServiceModel, ModelRef};

/// A `fulfills`-consistent set of model references.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelSet {
    refs: Vec<ModelRef>,
}

impl ModelSet {
    /// The empty set.
    pub fn new() -> Self {
        ModelSet::default()
    }

    /// Builds a set from the given references.
    ///
    /// # Errors
    ///
    /// Fails with `IncompatibleComponentModels` when two unrelated component
    /// classes are present.
    pub fn from_refs(refs: impl IntoIterator<Item = ModelRef>) -> Result<Self, ResolutionError> {
        let mut set = ModelSet::new();
        for re in refs {
            set.add(re)?;
        }
        Ok(set)
    }

    /// Adds one reference, enforcing component compatibility.
    pub fn add(&mut self, re: ModelRef) -> Result<(), ResolutionError> {
        if self.refs.contains(&re) {
            return Ok(());
        }
        if let ModelRef::Component(ref incoming) = re {
            let mut replace_at = None;
            for (i, existing) in self.refs.iter().enumerate() {
                let ModelRef::Component(existing) = existing else {
                    continue;
                };
                if incoming.fulfills(&ModelRef::Component(existing.clone())) {
                    // Incoming is the more derived class.
                    replace_at = Some(i);
                    break;
                }
                if existing.fulfills(&ModelRef::Component(incoming.clone())) {
                    // Existing already covers the incoming class.
                    return Ok(());
                }
                return Err(ResolutionError::IncompatibleComponentModels {
                    first: existing.name().to_string(),
                    second: incoming.name().to_string(),
                });
            }
            if let Some(i) = replace_at {
                self.refs[i] = re;
                return Ok(());
            }
        }
        self.refs.push(re);
        Ok(())
    }

    /// Merges `other` into this set.
    pub fn merge(&mut self, other: &ModelSet) -> Result<(), ResolutionError> {
        for re in &other.refs {
            self.add(re.clone())?;
        }
        Ok(())
    }

    /// The single component model selected by the set, if any.
    pub fn concrete(&self) -> Option<&ComponentModel> {
        self.refs.iter().find_map(|re| match re {
            ModelRef::Component(c) => Some(c),
            ModelRef::Service(_) => None,
        })
    }

    /// The services required by the set.
    pub fn services(&self) -> Vec<Arc<DataServiceModel>> {
        self.refs
            .iter()
            .filter_map(|re| match re {
                ModelRef::Service(s) => Some(Arc::clone(s)),
                ModelRef::Component(_) => None,
            })
            .collect()
    }

    /// All references in the set.
    pub fn refs(&self) -> &[ModelRef] {
        &self.refs
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Whether every reference of the set is fulfilled by `candidate`.
    pub fn fulfilled_by(&self, candidate: &ModelRef) -> bool {
        self.refs.iter().all(|re| candidate.fulfills(re))
    }
}

impl fmt::Display for ModelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, re) in self.refs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{re}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskContextModel;
    use std::sync::Arc;

    fn task(name: &str) -> ModelRef {
        ModelRef::task(Arc::new(TaskContextModel::new(name)))
    }

    fn derived_task(name: &str, parent: &str) -> ModelRef {
        let mut model = TaskContextModel::new(name);
        model.supermodel = Some(Arc::new(TaskContextModel::new(parent)));
        ModelRef::task(Arc::new(model))
    }

    #[test]
    fn test_unrelated_components_are_rejected() {
        let mut set = ModelSet::new();
        set.add(task("Imu")).unwrap();
        let err = set.add(task("Sonar")).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::IncompatibleComponentModels { .. }
        ));
    }

    #[test]
    fn test_most_derived_component_wins() {
        let mut set = ModelSet::new();
        set.add(task("Device")).unwrap();
        set.add(derived_task("Imu", "Device")).unwrap();
        assert_eq!(set.concrete().unwrap().name(), "Imu");

        // Adding the base again changes nothing.
        set.add(task("Device")).unwrap();
        assert_eq!(set.concrete().unwrap().name(), "Imu");
        assert_eq!(set.refs().len(), 1);
    }

    #[test]
    fn test_services_accumulate() {
        let mut set = ModelSet::new();
        let srv = Arc::new(crate::types::DataServiceModel::new("pose", vec![]));
        set.add(ModelRef::Service(Arc::clone(&srv))).unwrap();
        set.add(task("PoseTask")).unwrap();
        assert_eq!(set.services().len(), 1);
        assert_eq!(set.concrete().unwrap().name(), "PoseTask");
    }
}
