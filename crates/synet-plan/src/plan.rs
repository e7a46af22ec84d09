//! The plan: exclusive owner of task instances and their relations.

use std::collections::BTreeMap;

use synet_core::error::InternalError;
use synet_core::types::{InstanceModel, TaskId};

use crate::dependency::DependencyGraph;
use crate::flow::DataFlowGraph;
use crate::task::TaskInstance;

/// A task graph owned as a unit.
///
/// Tasks are owned by identity: every other structure references them by
/// [`TaskId`]. Removing or replacing a task keeps both relation graphs
/// consistent.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    next_id: u64,
    tasks: BTreeMap<TaskId, TaskInstance>,
    /// Port-to-port connections.
    pub flow: DataFlowGraph,
    /// Parent/child dependencies.
    pub dependencies: DependencyGraph,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Plan::default()
    }

    /// Adds a task instantiating `model` and returns its id.
    pub fn add_task(&mut self, model: InstanceModel) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(id, TaskInstance::new(id, model));
        id
    }

    /// The task with the given id.
    pub fn task(&self, id: TaskId) -> Option<&TaskInstance> {
        self.tasks.get(&id)
    }

    /// Mutable access to the task with the given id.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskInstance> {
        self.tasks.get_mut(&id)
    }

    /// Whether the plan contains the task.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// All task ids, ascending.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Iterates all tasks in id order.
    pub fn each_task(&self) -> impl Iterator<Item = &TaskInstance> {
        self.tasks.values()
    }

    /// Removes a task and every edge touching it.
    pub fn remove_task(&mut self, id: TaskId) -> Option<TaskInstance> {
        let task = self.tasks.remove(&id)?;
        self.flow.remove_task(id);
        self.dependencies.remove_task(id);
        Some(task)
    }

    /// Replaces `replaced` with `survivor`: every flow and dependency edge is
    /// rewired onto the survivor and the replaced task leaves the plan.
    /// Tasks that used `replaced` as their execution agent are repointed.
    ///
    /// # Errors
    ///
    /// Fails with [`InternalError`] when the two ids are equal or either task
    /// is not in the plan.
    pub fn replace_task(&mut self, survivor: TaskId, replaced: TaskId) -> Result<TaskInstance, InternalError> {
        if survivor == replaced {
            return Err(InternalError::new(format!(
                "attempted to replace {survivor} with itself"
            )));
        }
        if !self.contains(survivor) {
            return Err(InternalError::new(format!(
                "replacement survivor {survivor} is not in the plan"
            )));
        }
        if !self.contains(replaced) {
            return Err(InternalError::new(format!(
                "replaced task {replaced} is not in the plan"
            )));
        }
        self.flow.rewire(replaced, survivor);
        self.dependencies.rewire(replaced, survivor);
        for task in self.tasks.values_mut() {
            if task.execution_agent == Some(replaced) {
                task.execution_agent = Some(survivor);
            }
        }
        let removed = self.tasks.remove(&replaced).expect("checked above");
        Ok(removed)
    }

    /// Number of tasks in the plan.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synet_core::types::{ConnectionPolicy, TaskContextModel};

    fn model(name: &str) -> InstanceModel {
        InstanceModel::Task(Arc::new(TaskContextModel::new(name)))
    }

    #[test]
    fn test_add_and_remove() {
        let mut plan = Plan::new();
        let a = plan.add_task(model("A"));
        let b = plan.add_task(model("B"));
        plan.flow
            .add_connection(a, b, "out", "in", ConnectionPolicy::Data);

        assert_eq!(plan.len(), 2);
        plan.remove_task(b);
        assert_eq!(plan.len(), 1);
        assert!(plan.flow.is_empty());
    }

    #[test]
    fn test_replace_task_rewires() {
        let mut plan = Plan::new();
        let a = plan.add_task(model("A"));
        let b = plan.add_task(model("A"));
        let sink = plan.add_task(model("Sink"));
        plan.flow
            .add_connection(b, sink, "out", "in", ConnectionPolicy::Data);
        plan.dependencies.add_child(b, sink, "child");

        plan.replace_task(a, b).unwrap();
        assert!(!plan.contains(b));
        assert!(plan.flow.connections_between(a, sink).is_some());
        assert_eq!(plan.dependencies.children_of(a).len(), 1);
    }

    #[test]
    fn test_replace_task_repoints_agents() {
        let mut plan = Plan::new();
        let agent_a = plan.add_task(model("Agent"));
        let agent_b = plan.add_task(model("Agent"));
        let deployed = plan.add_task(model("T"));
        plan.task_mut(deployed).unwrap().execution_agent = Some(agent_b);

        plan.replace_task(agent_a, agent_b).unwrap();
        assert_eq!(plan.task(deployed).unwrap().execution_agent, Some(agent_a));
    }

    #[test]
    fn test_replace_with_itself_is_internal_error() {
        let mut plan = Plan::new();
        let a = plan.add_task(model("A"));
        assert!(plan.replace_task(a, a).is_err());
    }
}
