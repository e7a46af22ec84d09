//! Task instances and their merge capability.

use std::collections::BTreeMap;

use synet_core::types::{
    DeploymentBinding, DeploymentGroup, DeploymentHint, InstanceModel, TaskId, Value,
};

/// Lifecycle state of a task instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskState {
    /// Placeholder that still needs a concrete realization.
    Abstract,
    /// Instantiated but not started.
    Pending,
    /// Currently executing.
    Running,
    /// Terminated.
    Finished,
}

/// One task in a plan.
///
/// Instances are owned by their plan and referenced everywhere else through
/// their [`TaskId`].
#[derive(Clone, Debug)]
pub struct TaskInstance {
    /// Identifier inside the owning plan.
    pub id: TaskId,
    /// The instantiated model.
    pub model: InstanceModel,
    /// Lifecycle state.
    pub state: TaskState,
    /// Argument values set so far.
    pub arguments: BTreeMap<String, Value>,
    /// Name the task carries on its process server, when fixed.
    pub runtime_name: Option<String>,
    /// Device names attached to the task, used for merge disambiguation.
    pub device_names: Vec<String>,
    /// The deployment task owning this task's runtime, once deployed.
    pub execution_agent: Option<TaskId>,
    /// The physical slot this task is bound to, once deployed.
    pub binding: Option<DeploymentBinding>,
    /// Stand-in for a task that already exists in the committed plan.
    pub transaction_proxy: bool,
    /// Deployments the tasks below this one may use. The deployer consults
    /// a task's ancestors, so a group set here never binds the task itself.
    pub deployment_group: Option<DeploymentGroup>,
    /// Hints narrowing the deployment candidates.
    pub deployment_hints: Vec<DeploymentHint>,
}

impl TaskInstance {
    /// Creates an instance of `model`. Proxy models start abstract, anything
    /// else starts pending.
    pub fn new(id: TaskId, model: InstanceModel) -> Self {
        let state = if model.is_proxy() {
            TaskState::Abstract
        } else {
            TaskState::Pending
        };
        TaskInstance {
            id,
            model,
            state,
            arguments: BTreeMap::new(),
            runtime_name: None,
            device_names: Vec::new(),
            execution_agent: None,
            binding: None,
            transaction_proxy: false,
            deployment_group: None,
            deployment_hints: Vec::new(),
        }
    }

    /// Whether the task is still a placeholder.
    pub fn is_abstract(&self) -> bool {
        self.state == TaskState::Abstract || self.model.is_proxy()
    }

    /// Whether the task is instantiated but not started.
    pub fn is_pending(&self) -> bool {
        self.state == TaskState::Pending
    }

    /// Whether the task is running.
    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Whether the task has terminated.
    pub fn is_finished(&self) -> bool {
        self.state == TaskState::Finished
    }

    /// Whether every required argument of the model has a value.
    pub fn fully_instantiated(&self) -> bool {
        match &self.model {
            InstanceModel::Task(model) => model
                .all_arguments()
                .iter()
                .filter(|a| a.required)
                .all(|a| self.arguments.contains_key(&a.name) || a.default.is_some()),
            InstanceModel::Proxy(_) => false,
            InstanceModel::Composition(_) | InstanceModel::Deployment(_) => true,
        }
    }

    /// Whether this task can replace `other`: the model covers everything
    /// `other` fulfills, and the mutable state does not conflict.
    pub fn can_merge(&self, other: &TaskInstance) -> bool {
        if self.id == other.id {
            return false;
        }
        if !self.model.fulfills_instance(&other.model) {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.runtime_name, &other.runtime_name) {
            if a != b {
                return false;
            }
        }
        // Arguments must agree wherever both sides set a value.
        other
            .arguments
            .iter()
            .all(|(key, value)| match self.arguments.get(key) {
                Some(own) => own == value,
                None => true,
            })
    }

    /// Absorbs `other` into this task: arguments, names, and deployment
    /// constraints accumulate; this task's model and lifecycle state win.
    pub fn merge(&mut self, other: &TaskInstance) {
        for (key, value) in &other.arguments {
            self.arguments
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if self.runtime_name.is_none() {
            self.runtime_name = other.runtime_name.clone();
        }
        for name in &other.device_names {
            if !self.device_names.contains(name) {
                self.device_names.push(name.clone());
            }
        }
        for hint in &other.deployment_hints {
            if !self.deployment_hints.contains(hint) {
                self.deployment_hints.push(hint.clone());
            }
        }
        if self.deployment_group.is_none() {
            self.deployment_group = other.deployment_group.clone();
        }
    }
}
