//! The merge-candidate graph.
//!
//! Holds task ids only, never owning references; it is rebuilt from the plan
//! on every solver iteration and discarded afterwards.

use std::collections::{BTreeMap, BTreeSet};

use synet_core::types::TaskId;

/// Directed graph whose edge `a -> b` records that task `a` can replace task
/// `b`.
#[derive(Clone, Debug, Default)]
pub struct MergeGraph {
    forward: BTreeMap<TaskId, BTreeSet<TaskId>>,
    reverse: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl MergeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        MergeGraph::default()
    }

    /// Adds the edge `a -> b`.
    pub fn add_edge(&mut self, a: TaskId, b: TaskId) {
        self.forward.entry(a).or_default().insert(b);
        self.reverse.entry(b).or_default().insert(a);
    }

    /// Removes the edge `a -> b`.
    pub fn remove_edge(&mut self, a: TaskId, b: TaskId) {
        if let Some(set) = self.forward.get_mut(&a) {
            set.remove(&b);
            if set.is_empty() {
                self.forward.remove(&a);
            }
        }
        if let Some(set) = self.reverse.get_mut(&b) {
            set.remove(&a);
            if set.is_empty() {
                self.reverse.remove(&b);
            }
        }
    }

    /// Whether the edge `a -> b` exists.
    pub fn has_edge(&self, a: TaskId, b: TaskId) -> bool {
        self.forward.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Tasks that can replace `target`.
    pub fn parents_of(&self, target: TaskId) -> Vec<TaskId> {
        self.reverse
            .get(&target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tasks `source` can replace.
    pub fn children_of(&self, source: TaskId) -> Vec<TaskId> {
        self.forward
            .get(&source)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every task with at least one incoming edge, ascending.
    pub fn targets(&self) -> Vec<TaskId> {
        self.reverse.keys().copied().collect()
    }

    /// Every edge, in deterministic order.
    pub fn each_edge(&self) -> impl Iterator<Item = (TaskId, TaskId)> + '_ {
        self.forward
            .iter()
            .flat_map(|(a, targets)| targets.iter().map(move |b| (*a, *b)))
    }

    /// Pairs `(a, b)` with `a < b` connected in both directions.
    pub fn two_node_cycles(&self) -> Vec<(TaskId, TaskId)> {
        self.each_edge()
            .filter(|(a, b)| a < b && self.has_edge(*b, *a))
            .collect()
    }

    /// Tasks that can reach themselves through one or more edges.
    pub fn cycle_nodes(&self) -> BTreeSet<TaskId> {
        let mut out = BTreeSet::new();
        for &start in self.forward.keys() {
            if out.contains(&start) {
                continue;
            }
            // DFS from each successor; reaching `start` again closes a cycle.
            let mut stack: Vec<TaskId> = self.children_of(start);
            let mut seen = BTreeSet::new();
            while let Some(current) = stack.pop() {
                if current == start {
                    out.insert(start);
                    break;
                }
                if seen.insert(current) {
                    stack.extend(self.children_of(current));
                }
            }
        }
        out
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }
}
