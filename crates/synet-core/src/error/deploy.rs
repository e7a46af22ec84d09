//! Deployment binding errors.
//!
//! `MissingDeployments` is the one externally meaningful planning error: it
//! carries, per task, every candidate slot that was considered and who is
//! already using it, enough to render a human-readable report.

use std::fmt;

use thiserror::Error;

use crate::error::{InternalError, ResolutionError};
use crate::types::TaskId;

/// One candidate slot considered for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentCandidate {
    /// Process server hosting the candidate.
    pub process_server: String,
    /// Deployment model name.
    pub deployment: String,
    /// Slot name inside the deployment.
    pub slot: String,
    /// Tasks already allocated to this slot.
    pub used_by: Vec<TaskId>,
}

impl fmt::Display for DeploymentCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.process_server, self.deployment, self.slot
        )?;
        if !self.used_by.is_empty() {
            write!(f, " (in use by ")?;
            for (i, task) in self.used_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{task}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Diagnostic record for one task left without a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDeployment {
    /// The undeployed task.
    pub task: TaskId,
    /// The task's model name.
    pub model: String,
    /// Every candidate that was considered.
    pub candidates: Vec<DeploymentCandidate>,
}

impl fmt::Display for MissingDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.task, self.model)?;
        if self.candidates.is_empty() {
            write!(f, ": no candidate slot")
        } else {
            write!(f, ": candidates ")?;
            for (i, candidate) in self.candidates.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{candidate}")?;
            }
            Ok(())
        }
    }
}

/// Errors raised by the deployer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeployError {
    /// One or more task contexts could not be bound to a deployment slot.
    #[error("{} task(s) could not be deployed: {}", .missing.len(),
        .missing.iter().map(|m| m.to_string()).collect::<Vec<_>>().join("; "))]
    MissingDeployments {
        /// Per-task diagnostics.
        missing: Vec<MissingDeployment>,
    },

    /// A deployment hint could not be evaluated.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A structural invariant was violated while applying bindings.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_deployments_report() {
        let error = DeployError::MissingDeployments {
            missing: vec![MissingDeployment {
                task: TaskId(3),
                model: "Imu".to_string(),
                candidates: vec![DeploymentCandidate {
                    process_server: "main".to_string(),
                    deployment: "sensors".to_string(),
                    slot: "imu".to_string(),
                    used_by: vec![TaskId(1)],
                }],
            }],
        };
        let display = error.to_string();
        assert!(display.contains("1 task(s)"));
        assert!(display.contains("task#3 (Imu)"));
        assert!(display.contains("main/sensors:imu (in use by task#1)"));
    }
}
