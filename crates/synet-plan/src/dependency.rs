//! Parent/child dependency graph.
//!
//! Records which task depends on which, labelled with the role under which
//! the child was added (for compositions, the child name).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use synet_core::types::TaskId;

/// Directed parent-to-child relation with role labels.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    children: BTreeMap<TaskId, BTreeMap<TaskId, String>>,
    parents: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Adds a dependency from `parent` to `child` under `role`.
    pub fn add_child(&mut self, parent: TaskId, child: TaskId, role: impl Into<String>) {
        self.children
            .entry(parent)
            .or_default()
            .insert(child, role.into());
        self.parents.entry(child).or_default().insert(parent);
    }

    /// Removes the dependency from `parent` to `child`.
    pub fn remove_child(&mut self, parent: TaskId, child: TaskId) {
        if let Some(map) = self.children.get_mut(&parent) {
            map.remove(&child);
            if map.is_empty() {
                self.children.remove(&parent);
            }
        }
        if let Some(set) = self.parents.get_mut(&child) {
            set.remove(&parent);
            if set.is_empty() {
                self.parents.remove(&child);
            }
        }
    }

    /// Children of `task` with their roles.
    pub fn children_of(&self, task: TaskId) -> Vec<(TaskId, &str)> {
        self.children
            .get(&task)
            .map(|map| map.iter().map(|(id, role)| (*id, role.as_str())).collect())
            .unwrap_or_default()
    }

    /// Parents of `task`.
    pub fn parents_of(&self, task: TaskId) -> Vec<TaskId> {
        self.parents
            .get(&task)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ancestors of `task`, nearest first (BFS order, id-ordered per level).
    pub fn ancestors_of(&self, task: TaskId) -> Vec<TaskId> {
        let mut seen = BTreeSet::from([task]);
        let mut queue: VecDeque<TaskId> = self.parents_of(task).into();
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            queue.extend(self.parents_of(current));
        }
        out
    }

    /// Whether `ancestor` reaches `descendant` through child edges.
    pub fn is_ancestor_of(&self, ancestor: TaskId, descendant: TaskId) -> bool {
        self.ancestors_of(descendant).contains(&ancestor)
    }

    /// Whether two tasks have the same (role, child) set.
    pub fn same_children(&self, a: TaskId, b: TaskId) -> bool {
        let as_set = |task: TaskId| -> BTreeSet<(String, TaskId)> {
            self.children
                .get(&task)
                .map(|map| {
                    map.iter()
                        .map(|(id, role)| (role.clone(), *id))
                        .collect()
                })
                .unwrap_or_default()
        };
        as_set(a) == as_set(b)
    }

    /// Drops every dependency touching `task`.
    pub fn remove_task(&mut self, task: TaskId) {
        let children: Vec<TaskId> = self.children_of(task).into_iter().map(|(child, _)| child).collect();
        for child in children {
            if let Some(set) = self.parents.get_mut(&child) {
                set.remove(&task);
                if set.is_empty() {
                    self.parents.remove(&child);
                }
            }
        }
        self.children.remove(&task);
        for parent in self.parents_of(task) {
            if let Some(map) = self.children.get_mut(&parent) {
                map.remove(&task);
                if map.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        self.parents.remove(&task);
    }

    /// Transfers every dependency of `from` onto `to`. A dependency between
    /// the two tasks themselves is dropped; when both carry the same child,
    /// `to`'s existing role wins.
    pub fn rewire(&mut self, from: TaskId, to: TaskId) {
        let moved_children = self.children_of(from).into_iter()
            .map(|(id, role)| (id, role.to_string()))
            .collect::<Vec<_>>();
        let moved_parents = self.parents_of(from);

        for (child, role) in moved_children {
            self.remove_child(from, child);
            if child != to && !self.children.get(&to).is_some_and(|m| m.contains_key(&child)) {
                self.add_child(to, child, role);
            }
        }
        for parent in moved_parents {
            let role = self
                .children
                .get(&parent)
                .and_then(|m| m.get(&from))
                .cloned();
            self.remove_child(parent, from);
            if parent != to {
                if let Some(role) = role {
                    if !self.children.get(&parent).is_some_and(|m| m.contains_key(&to)) {
                        self.add_child(parent, to, role);
                    }
                }
            }
        }
    }
}
