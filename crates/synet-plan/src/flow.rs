//! Typed data-flow multigraph.
//!
//! Edges join two tasks and carry a map from (source port, sink port) pairs
//! to connection policies. All containers are ordered so that iteration, and
//! therefore every pass decision derived from it, is deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use synet_core::types::{ConnectionPolicy, TaskId};

/// Port-pair to policy mapping carried by one edge.
pub type ConnectionMap = BTreeMap<(String, String), ConnectionPolicy>;

/// Directed multigraph of port-to-port connections.
#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    edges: BTreeMap<(TaskId, TaskId), ConnectionMap>,
}

impl DataFlowGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        DataFlowGraph::default()
    }

    /// Adds one port-to-port connection. Re-adding an existing pair replaces
    /// its policy.
    pub fn add_connection(
        &mut self,
        source: TaskId,
        sink: TaskId,
        source_port: impl Into<String>,
        sink_port: impl Into<String>,
        policy: ConnectionPolicy,
    ) {
        self.edges
            .entry((source, sink))
            .or_default()
            .insert((source_port.into(), sink_port.into()), policy);
    }

    /// Removes one port-to-port connection; drops the edge when it was the
    /// last pair.
    pub fn remove_connection(
        &mut self,
        source: TaskId,
        sink: TaskId,
        source_port: &str,
        sink_port: &str,
    ) {
        if let Some(map) = self.edges.get_mut(&(source, sink)) {
            map.remove(&(source_port.to_string(), sink_port.to_string()));
            if map.is_empty() {
                self.edges.remove(&(source, sink));
            }
        }
    }

    /// The connections between two tasks, if any.
    pub fn connections_between(&self, source: TaskId, sink: TaskId) -> Option<&ConnectionMap> {
        self.edges.get(&(source, sink))
    }

    /// Iterates all edges.
    pub fn each_edge(&self) -> impl Iterator<Item = (TaskId, TaskId, &ConnectionMap)> {
        self.edges.iter().map(|((s, d), map)| (*s, *d, map))
    }

    /// Edges into `task`.
    pub fn each_in_edge(&self, task: TaskId) -> impl Iterator<Item = (TaskId, &ConnectionMap)> {
        self.edges
            .iter()
            .filter(move |((_, sink), _)| *sink == task)
            .map(|((source, _), map)| (*source, map))
    }

    /// Edges out of `task`.
    pub fn each_out_edge(&self, task: TaskId) -> impl Iterator<Item = (TaskId, &ConnectionMap)> {
        self.edges
            .iter()
            .filter(move |((source, _), _)| *source == task)
            .map(|((_, sink), map)| (*sink, map))
    }

    /// Sink ports of `task` that already have an incoming connection.
    pub fn connected_input_ports(&self, task: TaskId) -> BTreeSet<String> {
        self.each_in_edge(task)
            .flat_map(|(_, map)| map.keys().map(|(_, sink_port)| sink_port.clone()))
            .collect()
    }

    /// Tasks adjacent to `task`, ignoring direction.
    pub fn neighbors(&self, task: TaskId) -> BTreeSet<TaskId> {
        let mut out = BTreeSet::new();
        for ((source, sink), _) in &self.edges {
            if *source == task {
                out.insert(*sink);
            }
            if *sink == task {
                out.insert(*source);
            }
        }
        out
    }

    /// Tasks downstream of `task`.
    pub fn sinks_of(&self, task: TaskId) -> BTreeSet<TaskId> {
        self.each_out_edge(task).map(|(sink, _)| sink).collect()
    }

    /// Undirected hop distance from `from` to `to`; `None` when unreachable.
    pub fn distance(&self, from: TaskId, to: TaskId) -> Option<usize> {
        if from == to {
            return Some(0);
        }
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, 0usize)]);
        while let Some((current, dist)) = queue.pop_front() {
            for next in self.neighbors(current) {
                if next == to {
                    return Some(dist + 1);
                }
                if seen.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }
        None
    }

    /// Drops every edge touching `task`.
    pub fn remove_task(&mut self, task: TaskId) {
        self.edges
            .retain(|(source, sink), _| *source != task && *sink != task);
    }

    /// Transfers every edge of `from` onto `to`. Connections between the two
    /// tasks themselves are dropped rather than turned into self-loops; when
    /// both tasks carry the same port pair towards the same peer, `to`'s
    /// existing policy wins.
    pub fn rewire(&mut self, from: TaskId, to: TaskId) {
        let moved: Vec<_> = self
            .edges
            .iter()
            .filter(|((source, sink), _)| *source == from || *sink == from)
            .map(|(key, map)| (*key, map.clone()))
            .collect();
        for ((source, sink), map) in moved {
            self.edges.remove(&(source, sink));
            let new_source = if source == from { to } else { source };
            let new_sink = if sink == from { to } else { sink };
            if new_source == new_sink {
                continue;
            }
            let entry = self.edges.entry((new_source, new_sink)).or_default();
            for (ports, policy) in map {
                entry.entry(ports).or_insert(policy);
            }
        }
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
