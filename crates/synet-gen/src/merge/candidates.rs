//! Merge candidate generation.
//!
//! Scans the plan for pairs `(a, b)` where `a` could replace `b` and records
//! them as merge-graph edges. The structural checks come first; the final
//! word is the tasks' own `can_merge`.

use std::collections::BTreeSet;

use synet_core::types::TaskId;
use synet_plan::Plan;

use crate::merge::graph::MergeGraph;

/// Builds the merge graph for the given replacement targets. Edges in
/// `pruned` stay excluded across rebuilds within one solver run.
pub(crate) fn direct_merge_mappings(
    plan: &Plan,
    targets: &BTreeSet<TaskId>,
    pruned: &BTreeSet<(TaskId, TaskId)>,
) -> MergeGraph {
    let mut graph = MergeGraph::new();
    for &target_id in targets {
        let Some(target) = plan.task(target_id) else {
            continue;
        };
        // Transaction proxies stand in for committed tasks; they are never
        // replaced.
        if target.transaction_proxy {
            continue;
        }
        // A deployed task that already started cannot be displaced.
        if target.execution_agent.is_some() && !target.is_pending() {
            continue;
        }
        for source_id in plan.task_ids() {
            if source_id == target_id || pruned.contains(&(source_id, target_id)) {
                continue;
            }
            let source = plan.task(source_id).expect("id from the plan");
            if !source.is_abstract() && target.is_abstract() {
                continue;
            }
            // Two real deployments cannot be merged.
            if source.execution_agent.is_some() && target.execution_agent.is_some() {
                continue;
            }
            // Compositions only merge when their child sets are structurally
            // identical.
            if source.model.is_composition()
                && target.model.is_composition()
                && !plan.dependencies.same_children(source_id, target_id)
            {
                continue;
            }
            if source.can_merge(target) {
                tracing::trace!(
                    pass = "merge",
                    source = %source_id,
                    target = %target_id,
                    "merge candidate"
                );
                graph.add_edge(source_id, target_id);
            }
        }
    }
    graph
}
