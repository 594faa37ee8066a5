//! Path operations over the currently-active directed multigraph
//! connectivity, unit-weight shortest path, and bounded
//! all-simple-paths enumeration.
//!
//! Built on `petgraph` rather than hand-rolled traversal, reusing its
//! `astar`/`all_simple_paths` primitives the way several retrieved
//! dependency- and query-graph crates in this ecosystem do.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::engine::MutationEngine;
use crate::entity::{Node, Path};
use crate::id::{Locator, Uid};

/// A snapshot of the active subgraph, indexed for petgraph traversal.
/// Node weight is the node's `Uid` (only one version of a uid can be
/// active at once); edge weight is the specific active edge's `Locator`,
/// so callers can recover the exact Edge version used.
pub struct PathGraph<'e> {
    engine: &'e MutationEngine,
    graph: DiGraph<Uid, Locator>,
    index_of: HashMap<Uid, NodeIndex>,
}

impl<'e> PathGraph<'e> {
    /// Build a view over the engine's currently-active nodes and edges.
    pub fn active(engine: &'e MutationEngine) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();
        for node in engine.store().all_active_nodes() {
            let idx = graph.add_node(node.locator.uid.clone());
            index_of.insert(node.locator.uid.clone(), idx);
        }
        for edge in engine.store().all_active_edges() {
            if let (Some(&s), Some(&t)) = (
                index_of.get(&edge.source.locator.uid),
                index_of.get(&edge.target.locator.uid),
            ) {
                graph.add_edge(s, t, edge.locator.clone());
            }
        }
        PathGraph {
            engine,
            graph,
            index_of,
        }
    }

    fn node_record(&self, idx: NodeIndex) -> Node {
        let uid = &self.graph[idx];
        self.engine
            .find_active_node(uid)
            .expect("active node in path graph must have an active record")
    }

    /// Pick an edge connecting `a` to `b` directly (arbitrary choice among
    /// parallel edges — all have unit weight, so any is a valid shortest
    /// hop).
    fn an_edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<Locator> {
        self.graph
            .edges_connecting(a, b)
            .next()
            .map(|e| e.weight().clone())
    }

    /// Undirected weak connectivity check between two uids.
    pub fn path_exists(&self, source: &Uid, target: &Uid) -> bool {
        let (Some(&s), Some(&t)) = (self.index_of.get(source), self.index_of.get(target)) else {
            return false;
        };
        if s == t {
            return true;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(s);
        visited.insert(s);
        while let Some(cur) = queue.pop_front() {
            let neighbors = self
                .graph
                .neighbors_undirected(cur)
                .collect::<Vec<_>>();
            for n in neighbors {
                if n == t {
                    return true;
                }
                if visited.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        false
    }

    /// Dijkstra with unit edge weights, directed. `None` if unreachable.
    pub fn shortest_path(&self, source: &Uid, target: &Uid) -> Option<Path> {
        let &s = self.index_of.get(source)?;
        let &t = self.index_of.get(target)?;
        if s == t {
            return Some(Path::single(self.node_record(s)));
        }
        let (_, node_path) = petgraph::algo::astar(
            &self.graph,
            s,
            |finish| finish == t,
            |_| 1u32,
            |_| 0u32,
        )?;
        Some(self.build_path(&node_path))
    }

    /// Enumerate all simple directed paths from `source` to `target`,
    /// length bounded by the vertex count. `all_simple_paths` already
    /// guarantees no revisited vertex; the extra `is_simple` check below
    /// guards against generator edge cases, per spec.
    pub fn all_paths(&self, source: &Uid, target: &Uid) -> Vec<Path> {
        let (Some(&s), Some(&t)) = (self.index_of.get(source), self.index_of.get(target)) else {
            return Vec::new();
        };
        if s == t {
            return vec![Path::single(self.node_record(s))];
        }
        let bound = self.graph.node_count();
        petgraph::algo::all_simple_paths::<Vec<_>, _>(&self.graph, s, t, 0, Some(bound))
            .filter(|p| is_simple(p))
            .map(|node_path| self.build_path(&node_path))
            .collect()
    }

    fn build_path(&self, node_path: &[NodeIndex]) -> Path {
        let mut iter = node_path.iter().copied();
        let first = iter.next().expect("path must have at least one node");
        let start = self.node_record(first);
        let mut hops = Vec::with_capacity(node_path.len().saturating_sub(1));
        let mut prev = first;
        for next in iter {
            let edge_locator = self
                .an_edge_between(prev, next)
                .expect("consecutive path nodes must be connected by an edge");
            let edge = self
                .engine
                .find_edge(&edge_locator)
                .expect("edge selected from the active path graph must exist in the store");
            hops.push((edge, self.node_record(next)));
            prev = next;
        }
        Path::new(start, hops)
    }
}

fn is_simple(path: &[NodeIndex]) -> bool {
    let mut seen = HashSet::with_capacity(path.len());
    path.iter().all(|n| seen.insert(*n))
}
