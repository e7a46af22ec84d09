//! Deployment bindings, groups, and hints.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ResolutionError;
use crate::types::{DeploymentModel, TaskContextModel};

/// The physical slot a deployed task is bound to.
#[derive(Clone, Debug)]
pub struct DeploymentBinding {
    /// Name of the process server hosting the deployment.
    pub process_server: String,
    /// The deployment model providing the slot.
    pub deployment: Arc<DeploymentModel>,
    /// Slot name inside the deployment.
    pub slot: String,
}

impl DeploymentBinding {
    /// Stable identity of the bound slot.
    pub fn slot_key(&self) -> (String, String, String) {
        (
            self.process_server.clone(),
            self.deployment.name.clone(),
            self.slot.clone(),
        )
    }
}

impl fmt::Display for DeploymentBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.process_server, self.deployment.name, self.slot
        )
    }
}

impl PartialEq for DeploymentBinding {
    fn eq(&self, other: &Self) -> bool {
        self.slot_key() == other.slot_key()
    }
}

impl Eq for DeploymentBinding {}

/// One deployment made available on a process server.
#[derive(Clone, Debug)]
pub struct DeploymentGroupEntry {
    /// Name of the hosting process server.
    pub process_server: String,
    /// The deployment model.
    pub deployment: Arc<DeploymentModel>,
}

impl PartialEq for DeploymentGroupEntry {
    fn eq(&self, other: &Self) -> bool {
        self.process_server == other.process_server
            && self.deployment.name == other.deployment.name
    }
}

impl Eq for DeploymentGroupEntry {}

/// A set of deployments available for selection during deployment binding.
#[derive(Clone, Debug, Default)]
pub struct DeploymentGroup {
    /// Entries, in registration order.
    pub entries: Vec<DeploymentGroupEntry>,
}

impl DeploymentGroup {
    /// The empty group.
    pub fn new() -> Self {
        DeploymentGroup::default()
    }

    /// Registers a deployment on a process server.
    pub fn register(&mut self, process_server: impl Into<String>, deployment: Arc<DeploymentModel>) {
        let entry = DeploymentGroupEntry {
            process_server: process_server.into(),
            deployment,
        };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Iterates every slot of every entry as (entry, slot name, task model).
    pub fn each_slot(
        &self,
    ) -> impl Iterator<Item = (&DeploymentGroupEntry, &str, &Arc<TaskContextModel>)> {
        self.entries.iter().flat_map(|entry| {
            entry
                .deployment
                .slots
                .iter()
                .map(move |(slot, model)| (entry, slot.as_str(), model))
        })
    }

    /// Whether the group has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A hint narrowing deployment candidates for a placeholder.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeploymentHint {
    /// Candidates must come from the named deployment model.
    Deployment(String),
    /// Candidate slot names must match this regular expression.
    SlotPattern(String),
}

impl DeploymentHint {
    /// Whether the hint accepts the (deployment name, slot name) candidate.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidSelection` when a slot pattern is not a valid
    /// regular expression.
    pub fn matches(&self, deployment: &str, slot: &str) -> Result<bool, ResolutionError> {
        match self {
            DeploymentHint::Deployment(name) => Ok(name == deployment),
            DeploymentHint::SlotPattern(pattern) => {
                let re = Regex::new(pattern).map_err(|e| ResolutionError::InvalidSelection {
                    key: format!("hint /{pattern}/"),
                    reason: format!("invalid slot pattern: {e}"),
                })?;
                Ok(re.is_match(slot))
            }
        }
    }
}

impl fmt::Display for DeploymentHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentHint::Deployment(name) => write!(f, "deployment:{name}"),
            DeploymentHint::SlotPattern(pattern) => write!(f, "slot:/{pattern}/"),
        }
    }
}
