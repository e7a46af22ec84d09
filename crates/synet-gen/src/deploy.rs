//! Deployment binding.
//!
//! Associates every remaining task context (and service proxy) with a slot
//! of a deployment on a process server. Candidates come from the nearest
//! ancestor carrying a deployment group, falling back to the default group;
//! ambiguity is resolved by runtime name, then by hints. Each selected slot
//! is instantiated and the abstract task is merged into the deployed one,
//! one task at a time, so per-task connectivity survives the rewrite.

use std::collections::BTreeMap;
use std::sync::Arc;

use synet_core::error::{DeployError, DeploymentCandidate, MissingDeployment};
use synet_core::types::{
    DeploymentBinding, DeploymentGroup, DeploymentGroupEntry, InstanceModel, ModelRef,
    TaskContextModel, TaskId,
};
use synet_plan::{Plan, PlanDelta, TaskState, Transaction};

/// Key identifying one physical slot: (process server, deployment, slot).
type SlotKey = (String, String, String);

/// One slot considered for a task.
#[derive(Clone, Debug)]
struct Candidate {
    entry: DeploymentGroupEntry,
    slot: String,
    model: Arc<TaskContextModel>,
}

impl Candidate {
    fn key(&self) -> SlotKey {
        (
            self.entry.process_server.clone(),
            self.entry.deployment.name.clone(),
            self.slot.clone(),
        )
    }
}

/// Binds task contexts to deployment slots.
pub struct Deployer {
    default_group: DeploymentGroup,
}

impl Deployer {
    /// Creates a deployer with the given default deployment group.
    pub fn new(default_group: DeploymentGroup) -> Self {
        Deployer { default_group }
    }

    /// Deploys every unbound task context in the plan, committing atomically.
    ///
    /// # Errors
    ///
    /// Fails with `MissingDeployments` when a non-abstract, non-finished task
    /// context ends up without a binding; the plan is untouched in that case.
    pub fn deploy(&self, plan: &mut Plan) -> Result<PlanDelta, DeployError> {
        let span = synet_core::diag::pass_span("deploy");
        let _guard = span.enter();

        let mut txn = Transaction::new(plan);
        let working = txn.plan_mut();

        // Slots already claimed by previously deployed tasks.
        let mut allocations: BTreeMap<SlotKey, TaskId> = working
            .each_task()
            .filter_map(|task| task.binding.as_ref().map(|b| (b.slot_key(), task.id)))
            .collect();

        let mut selected: Vec<(TaskId, Candidate)> = Vec::new();
        let mut missing: Vec<MissingDeployment> = Vec::new();

        for task_id in working.task_ids() {
            let task = working.task(task_id).expect("id from the plan");
            let deployable = matches!(
                task.model,
                InstanceModel::Task(_) | InstanceModel::Proxy(_)
            ) && task.binding.is_none()
                && task.execution_agent.is_none()
                && !task.is_finished();
            if !deployable {
                continue;
            }

            let candidates = self.candidates_for(working, task_id);
            let report = MissingDeployment {
                task: task_id,
                model: task.model.name().to_string(),
                candidates: candidates
                    .iter()
                    .map(|c| {
                        let (process_server, deployment, slot) = c.key();
                        DeploymentCandidate {
                            process_server,
                            deployment,
                            slot,
                            used_by: allocations
                                .get(&c.key())
                                .map(|&id| vec![id])
                                .unwrap_or_default(),
                        }
                    })
                    .collect(),
            };

            let narrowed = narrow_candidates(task, candidates)?;
            match narrowed {
                Some(candidate) => {
                    if let Some(&user) = allocations.get(&candidate.key()) {
                        tracing::debug!(
                            pass = "deploy",
                            task = %task_id,
                            slot = %candidate.slot,
                            used_by = %user,
                            "best candidate already allocated"
                        );
                        missing.push(report);
                    } else {
                        allocations.insert(candidate.key(), task_id);
                        selected.push((task_id, candidate));
                    }
                }
                None => {
                    tracing::debug!(
                        pass = "deploy",
                        task = %task_id,
                        candidates = report.candidates.len(),
                        "no unambiguous deployment candidate"
                    );
                    missing.push(report);
                }
            }
        }

        // Tasks that may stay abstract are reported only in the trace; the
        // error covers concrete task contexts.
        missing.retain(|m| {
            working
                .task(m.task)
                .is_some_and(|task| !task.is_abstract() && !task.is_finished())
        });
        if !missing.is_empty() {
            return Err(DeployError::MissingDeployments { missing });
        }

        // Apply: instantiate each deployment once per process server, then
        // merge every abstract task into its deployed counterpart one at a
        // time to carry per-task connectivity through the rewrite.
        let mut agents: BTreeMap<(String, String), TaskId> = BTreeMap::new();
        for (task_id, candidate) in selected {
            let agent_key = (
                candidate.entry.process_server.clone(),
                candidate.entry.deployment.name.clone(),
            );
            let agent_id = *agents.entry(agent_key).or_insert_with(|| {
                working.add_task(InstanceModel::Deployment(Arc::clone(
                    &candidate.entry.deployment,
                )))
            });

            let deployed = working.add_task(InstanceModel::Task(Arc::clone(&candidate.model)));
            {
                let task = working.task_mut(deployed).expect("just added");
                task.state = TaskState::Pending;
                task.runtime_name = Some(candidate.slot.clone());
                task.execution_agent = Some(agent_id);
                task.binding = Some(DeploymentBinding {
                    process_server: candidate.entry.process_server.clone(),
                    deployment: Arc::clone(&candidate.entry.deployment),
                    slot: candidate.slot.clone(),
                });
            }
            working.dependencies.add_child(agent_id, deployed, candidate.slot.clone());

            let replaced = working.task(task_id).expect("selected from the plan").clone();
            working
                .task_mut(deployed)
                .expect("just added")
                .merge(&replaced);
            working.replace_task(deployed, task_id)?;
            tracing::debug!(
                pass = "deploy",
                task = %task_id,
                deployed = %deployed,
                slot = %candidate.slot,
                "bound to deployment slot"
            );
        }

        Ok(txn.commit(plan))
    }

    /// Candidate slots for a task: walk up the task's ancestors, nearest
    /// first, and take the first deployment group yielding a non-empty
    /// candidate set; the default group is the fallback. A group on the task
    /// itself constrains its descendants, not the task.
    fn candidates_for(&self, plan: &Plan, task_id: TaskId) -> Vec<Candidate> {
        let task = match plan.task(task_id) {
            Some(task) => task,
            None => return Vec::new(),
        };
        let mut scopes: Vec<&DeploymentGroup> = Vec::new();
        for ancestor in plan.dependencies.ancestors_of(task_id) {
            if let Some(group) = plan.task(ancestor).and_then(|t| t.deployment_group.as_ref()) {
                scopes.push(group);
            }
        }
        for group in scopes {
            let candidates = slots_fulfilling(group, task);
            if !candidates.is_empty() {
                return candidates;
            }
        }
        slots_fulfilling(&self.default_group, task)
    }
}

/// The slots of `group` whose task model can stand in for `task`.
fn slots_fulfilling(group: &DeploymentGroup, task: &synet_plan::TaskInstance) -> Vec<Candidate> {
    group
        .each_slot()
        .filter(|(_, _, slot_model)| match &task.model {
            InstanceModel::Task(required) => slot_model.fulfills_task(required),
            InstanceModel::Proxy(proxy) => {
                let component =
                    synet_core::types::ComponentModel::Task(Arc::clone(slot_model));
                proxy
                    .services
                    .iter()
                    .all(|s| component.fulfills(&ModelRef::Service(Arc::clone(s))))
            }
            _ => false,
        })
        .map(|(entry, slot, model)| Candidate {
            entry: entry.clone(),
            slot: slot.to_string(),
            model: Arc::clone(model),
        })
        .collect()
}

/// Applies the disambiguation passes, stopping at the first that leaves
/// exactly one candidate.
fn narrow_candidates(
    task: &synet_plan::TaskInstance,
    mut candidates: Vec<Candidate>,
) -> Result<Option<Candidate>, DeployError> {
    if candidates.is_empty() {
        return Ok(None);
    }

    // Explicit runtime name: only the slot with that name may host the task.
    if let Some(name) = &task.runtime_name {
        candidates.retain(|c| c.slot == *name);
        return Ok(match candidates.len() {
            1 => Some(candidates.remove(0)),
            _ => None,
        });
    }
    if candidates.len() == 1 {
        return Ok(Some(candidates.remove(0)));
    }

    // Deployment hints.
    if !task.deployment_hints.is_empty() {
        let mut hinted = Vec::new();
        for candidate in &candidates {
            for hint in &task.deployment_hints {
                if hint.matches(&candidate.entry.deployment.name, &candidate.slot)? {
                    hinted.push(candidate.clone());
                    break;
                }
            }
        }
        if hinted.len() == 1 {
            return Ok(Some(hinted.remove(0)));
        }
    }
    Ok(None)
}
