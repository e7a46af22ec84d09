//! The merge solver's reduction loop.
//!
//! Each iteration rebuilds the merge graph, resolves two-node cycles through
//! the merge ordering, applies every unambiguous merge, breaks remaining
//! cycles one within-cycle edge at a time, and finally disambiguates targets
//! with competing parents. The outer loop re-seeds from the neighborhood of
//! merged tasks until a pass merges nothing.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use synet_core::error::InternalError;
use synet_core::types::TaskId;
use synet_plan::{Plan, PlanDelta, Transaction};

use crate::merge::{direct_merge_mappings, merge_ordering};

/// Collapses semantically identical tasks in a plan.
pub struct MergeSolver {
    max_passes: usize,
}

impl Default for MergeSolver {
    fn default() -> Self {
        MergeSolver::new()
    }
}

impl MergeSolver {
    /// Creates a solver with the default pass bound.
    pub fn new() -> Self {
        MergeSolver { max_passes: 64 }
    }

    /// Creates a solver with an explicit safety bound on outer passes.
    pub fn with_max_passes(max_passes: usize) -> Self {
        MergeSolver { max_passes }
    }

    /// Merges identical tasks until a fixed point, committing the rewrite
    /// atomically.
    ///
    /// # Errors
    ///
    /// Fails with [`InternalError`] when a structural invariant breaks or the
    /// pass bound is exceeded; the plan is untouched in that case.
    pub fn merge_identical_tasks(&self, plan: &mut Plan) -> Result<PlanDelta, InternalError> {
        let span = synet_core::diag::pass_span("merge");
        let _guard = span.enter();

        let mut txn = Transaction::new(plan);
        let working = txn.plan_mut();

        let mut seeds: BTreeSet<TaskId> = working.task_ids().into_iter().collect();
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > self.max_passes {
                return Err(InternalError::new(format!(
                    "merge solver did not reach a fixed point within {} passes",
                    self.max_passes
                )));
            }
            let merged = self.reduce(working, &seeds)?;
            if merged.is_empty() {
                break;
            }
            // Merging children may make parents mergeable, and rewired sinks
            // may now be duplicates: re-seed from both.
            seeds = BTreeSet::new();
            for (survivor, _) in &merged {
                if !working.contains(*survivor) {
                    continue;
                }
                seeds.extend(working.flow.sinks_of(*survivor));
                for parent in working.dependencies.parents_of(*survivor) {
                    let is_composition = working
                        .task(parent)
                        .is_some_and(|t| t.model.is_composition());
                    if is_composition {
                        seeds.insert(parent);
                    }
                }
                seeds.insert(*survivor);
            }
            if seeds.is_empty() {
                break;
            }
        }
        Ok(txn.commit(plan))
    }

    /// One reduction pass over the given replacement targets. Returns the
    /// applied merges as (survivor, replaced) pairs.
    fn reduce(
        &self,
        plan: &mut Plan,
        seeds: &BTreeSet<TaskId>,
    ) -> Result<Vec<(TaskId, TaskId)>, InternalError> {
        let mut applied = Vec::new();
        let mut pruned: BTreeSet<(TaskId, TaskId)> = BTreeSet::new();
        let mut rounds = 0;
        loop {
            rounds += 1;
            if rounds > self.max_passes * 16 {
                return Err(InternalError::new(
                    "merge reduction did not converge".to_string(),
                ));
            }
            let targets: BTreeSet<TaskId> = seeds
                .iter()
                .copied()
                .filter(|id| plan.contains(*id))
                .collect();
            let mut graph = direct_merge_mappings(plan, &targets, &pruned);

            // Two-node cycles are decided by the merge ordering; the lesser
            // direction is removed.
            for (x, y) in graph.two_node_cycles() {
                let (Some(task_x), Some(task_y)) = (plan.task(x), plan.task(y)) else {
                    continue;
                };
                match merge_ordering(task_x, task_y) {
                    Some(Ordering::Greater) => {
                        // x survives: drop the edge replacing x by y.
                        graph.remove_edge(y, x);
                        pruned.insert((y, x));
                    }
                    Some(Ordering::Less) => {
                        graph.remove_edge(x, y);
                        pruned.insert((x, y));
                    }
                    Some(Ordering::Equal) | None => {}
                }
            }

            let cycle_nodes = graph.cycle_nodes();
            let mut one_parent: Vec<(TaskId, TaskId)> = Vec::new();
            let mut ambiguous: Vec<(TaskId, Vec<TaskId>)> = Vec::new();
            for target in graph.targets() {
                let parents = graph.parents_of(target);
                match parents.len() {
                    1 if !cycle_nodes.contains(&target) => {
                        one_parent.push((parents[0], target));
                    }
                    0 | 1 => {}
                    _ => ambiguous.push((target, parents)),
                }
            }

            if !one_parent.is_empty() {
                let merged = self.apply_merges(plan, &one_parent)?;
                if !merged.is_empty() {
                    applied.extend(merged);
                    continue;
                }
            }

            if !cycle_nodes.is_empty() {
                // Break one within-cycle edge and retry; iterating to a
                // fixed point removes one edge per remaining cycle.
                let within = graph
                    .each_edge()
                    .find(|(a, b)| cycle_nodes.contains(a) && cycle_nodes.contains(b));
                if let Some((a, b)) = within {
                    tracing::debug!(
                        pass = "merge",
                        source = %a,
                        target = %b,
                        "breaking merge cycle"
                    );
                    pruned.insert((a, b));
                    continue;
                }
            }

            let mut progressed = false;
            for (target, parents) in &ambiguous {
                if !plan.contains(*target) {
                    continue;
                }
                match self.disambiguate(plan, *target, parents) {
                    Some(winner) => {
                        let merged = self.apply_merges(plan, &[(winner, *target)])?;
                        if !merged.is_empty() {
                            applied.extend(merged);
                            progressed = true;
                        }
                    }
                    None => {
                        tracing::debug!(
                            pass = "merge",
                            target = %target,
                            candidates = parents.len(),
                            "ambiguous merge target left unchanged"
                        );
                    }
                }
            }
            if progressed {
                continue;
            }
            break;
        }
        Ok(applied)
    }

    /// Applies a batch of single-parent merges, re-validating each pair
    /// against the current plan state.
    fn apply_merges(
        &self,
        plan: &mut Plan,
        merges: &[(TaskId, TaskId)],
    ) -> Result<Vec<(TaskId, TaskId)>, InternalError> {
        let mut applied = Vec::new();
        for &(survivor, replaced) in merges {
            if survivor == replaced {
                return Err(InternalError::new(format!(
                    "merge of {survivor} with itself"
                )));
            }
            if !plan.contains(survivor) || !plan.contains(replaced) {
                continue;
            }
            // Earlier merges in the batch may have invalidated this pair.
            let still_valid = {
                let survivor_task = plan.task(survivor).expect("checked");
                let replaced_task = plan.task(replaced).expect("checked");
                survivor_task.can_merge(replaced_task)
            };
            if !still_valid {
                continue;
            }
            let replaced_task = plan.task(replaced).expect("checked").clone();
            plan.task_mut(survivor)
                .expect("checked")
                .merge(&replaced_task);
            plan.replace_task(survivor, replaced)?;
            tracing::debug!(
                pass = "merge",
                survivor = %survivor,
                replaced = %replaced,
                "merged"
            );
            applied.push((survivor, replaced));
        }
        Ok(applied)
    }

    /// Disambiguates a target with several candidate parents. Three passes
    /// run in order, stopping as soon as exactly one candidate remains.
    fn disambiguate(&self, plan: &Plan, target: TaskId, parents: &[TaskId]) -> Option<TaskId> {
        let mut candidates: Vec<TaskId> = parents
            .iter()
            .copied()
            .filter(|id| plan.contains(*id))
            .collect();
        candidates.sort_unstable();
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }
        if candidates.is_empty() {
            return None;
        }

        // Dependency dominance: a candidate that is an ancestor of another
        // drops the descendant.
        let dominated: BTreeSet<TaskId> = candidates
            .iter()
            .copied()
            .filter(|&y| {
                candidates
                    .iter()
                    .any(|&x| x != y && plan.dependencies.is_ancestor_of(x, y))
            })
            .collect();
        if !dominated.is_empty() {
            candidates.retain(|id| !dominated.contains(id));
            tracing::debug!(
                pass = "merge",
                target = %target,
                remaining = candidates.len(),
                "dependency dominance applied"
            );
        }
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }

        // Name match against the target's device names.
        let device_names = &plan.task(target)?.device_names;
        if !device_names.is_empty() {
            let named: Vec<TaskId> = candidates
                .iter()
                .copied()
                .filter(|&id| {
                    let task = plan.task(id).expect("filtered");
                    let runtime = task.runtime_name.as_deref();
                    let slot = task.binding.as_ref().map(|b| b.slot.as_str());
                    let deployment = task.binding.as_ref().map(|b| b.deployment.name.as_str());
                    device_names.iter().any(|name| {
                        Some(name.as_str()) == runtime
                            || Some(name.as_str()) == slot
                            || Some(name.as_str()) == deployment
                    })
                })
                .collect();
            if !named.is_empty() {
                candidates = named;
                tracing::debug!(
                    pass = "merge",
                    target = %target,
                    remaining = candidates.len(),
                    "name match applied"
                );
            }
        }
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }

        // Locality: keep the candidates closest to the target's data-flow
        // neighborhood; unreachable counts as infinity.
        let neighbors = plan.flow.neighbors(target);
        if !neighbors.is_empty() {
            let distance_of = |id: TaskId| -> usize {
                neighbors
                    .iter()
                    .filter_map(|&n| plan.flow.distance(id, n))
                    .min()
                    .unwrap_or(usize::MAX)
            };
            let best = candidates.iter().map(|&id| distance_of(id)).min()?;
            if best != usize::MAX {
                candidates.retain(|&id| distance_of(id) == best);
                tracing::debug!(
                    pass = "merge",
                    target = %target,
                    remaining = candidates.len(),
                    "locality applied"
                );
            }
        }
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synet_core::types::{ConnectionPolicy, InstanceModel, TaskContextModel, Value};
    use synet_plan::TaskState;

    fn model(name: &str) -> InstanceModel {
        InstanceModel::Task(Arc::new(TaskContextModel::new(name)))
    }

    #[test]
    fn test_two_identical_pending_tasks_merge_to_one() {
        let mut plan = Plan::new();
        plan.add_task(model("Imu"));
        plan.add_task(model("Imu"));

        let delta = MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(delta.removed_tasks.len(), 1);
    }

    #[test]
    fn test_running_task_survives_merge() {
        let mut plan = Plan::new();
        let t1 = plan.add_task(model("Imu"));
        let t2 = plan.add_task(model("Imu"));
        plan.task_mut(t1).unwrap().state = TaskState::Running;

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.contains(t1));
        assert!(!plan.contains(t2));
    }

    #[test]
    fn test_merge_preserves_external_connections() {
        let mut plan = Plan::new();
        let t1 = plan.add_task(model("Imu"));
        let t2 = plan.add_task(model("Imu"));
        let sink_a = plan.add_task(model("SinkA"));
        let sink_b = plan.add_task(model("SinkB"));
        plan.flow
            .add_connection(t1, sink_a, "samples", "in", ConnectionPolicy::Data);
        plan.flow
            .add_connection(t2, sink_b, "samples", "in", ConnectionPolicy::Data);

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();

        // One Imu remains, feeding both sinks.
        assert_eq!(plan.len(), 3);
        let survivor = plan
            .each_task()
            .find(|t| t.model.name() == "Imu")
            .unwrap()
            .id;
        assert!(plan.flow.connections_between(survivor, sink_a).is_some());
        assert!(plan.flow.connections_between(survivor, sink_b).is_some());
    }

    #[test]
    fn test_conflicting_arguments_block_merging() {
        let mut plan = Plan::new();
        let t1 = plan.add_task(model("Imu"));
        let t2 = plan.add_task(model("Imu"));
        plan.task_mut(t1)
            .unwrap()
            .arguments
            .insert("rate".to_string(), Value::Integer(100));
        plan.task_mut(t2)
            .unwrap()
            .arguments
            .insert("rate".to_string(), Value::Integer(200));

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_merging_is_idempotent() {
        let mut plan = Plan::new();
        plan.add_task(model("Imu"));
        plan.add_task(model("Imu"));
        plan.add_task(model("Sonar"));

        let solver = MergeSolver::new();
        solver.merge_identical_tasks(&mut plan).unwrap();
        let after_first: Vec<_> = plan.task_ids();
        let delta = solver.merge_identical_tasks(&mut plan).unwrap();
        assert_eq!(plan.task_ids(), after_first);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_merging_children_makes_parents_mergeable() {
        let mut plan = Plan::new();
        let comp_model = InstanceModel::Composition(Arc::new(
            synet_core::types::CompositionModel::new("C"),
        ));
        let c1 = plan.add_task(comp_model.clone());
        let c2 = plan.add_task(comp_model);
        let imu1 = plan.add_task(model("Imu"));
        let imu2 = plan.add_task(model("Imu"));
        plan.dependencies.add_child(c1, imu1, "imu");
        plan.dependencies.add_child(c2, imu2, "imu");

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();

        // First the children merge, then the now-identical compositions.
        assert_eq!(plan.len(), 2);
        let compositions = plan
            .each_task()
            .filter(|t| t.model.is_composition())
            .count();
        assert_eq!(compositions, 1);
    }

    #[test]
    fn test_name_match_disambiguation() {
        let mut plan = Plan::new();
        // Two deployed candidates compete for the same pending target.
        let agent = plan.add_task(model("Agent"));
        let front = plan.add_task(model("Imu"));
        let rear = plan.add_task(model("Imu"));
        let target = plan.add_task(model("Imu"));
        {
            let t = plan.task_mut(front).unwrap();
            t.runtime_name = Some("imu_front".to_string());
            t.execution_agent = Some(agent);
        }
        {
            let t = plan.task_mut(rear).unwrap();
            t.runtime_name = Some("imu_rear".to_string());
            t.execution_agent = Some(agent);
        }
        plan.task_mut(target)
            .unwrap()
            .device_names
            .push("imu_front".to_string());

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();

        // The target merged into the front IMU; the rear one still stands.
        assert!(!plan.contains(target));
        assert!(plan.contains(front));
        assert!(plan.contains(rear));
    }

    #[test]
    fn test_determinism_under_stable_ids() {
        let build = || {
            let mut plan = Plan::new();
            for _ in 0..4 {
                plan.add_task(model("Imu"));
            }
            plan.add_task(model("Sonar"));
            plan
        };
        let mut plan_a = build();
        let mut plan_b = build();
        let solver = MergeSolver::new();
        solver.merge_identical_tasks(&mut plan_a).unwrap();
        solver.merge_identical_tasks(&mut plan_b).unwrap();
        assert_eq!(plan_a.task_ids(), plan_b.task_ids());
    }
}
