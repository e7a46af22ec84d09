//! Task identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a task instance inside a plan.
///
/// The plan hands these out; graphs built during a transformation pass (merge
/// graph, deltas) store ids rather than owning references. Ids are ordered so
/// that tie-breaks among equally ranked candidates are deterministic.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}
