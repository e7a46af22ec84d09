//! Synet Plan - the living task graph rewritten by the transformation passes.
//!
//! A [`Plan`] exclusively owns its task instances and two relations over
//! them: the typed data-flow multigraph and the parent/child dependency
//! graph. Passes never mutate a plan directly; they stage their rewrite in a
//! [`Transaction`] and commit it atomically, yielding a [`PlanDelta`] for
//! downstream consumers.

pub mod dependency;
pub mod flow;
pub mod plan;
pub mod task;
pub mod transaction;

pub use dependency::DependencyGraph;
pub use flow::{ConnectionMap, DataFlowGraph};
pub use plan::Plan;
pub use task::{TaskInstance, TaskState};
pub use transaction::{PlanDelta, Transaction};
