//! In-memory directed multigraph keyed by entity locator.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::entity::{Edge, Node};
use crate::id::{Locator, Uid};

/// Structural events the store emits to an optional listener, used by
/// persistence backends. Emitted at most once per physical operation,
/// after the store's own index is consistent.
pub trait ChangeListener {
    fn vertex_added(&mut self, node: &Node);
    fn vertex_removed(&mut self, node: &Node);
    fn edge_added(&mut self, edge: &Edge);
    fn edge_removed(&mut self, edge: &Edge);
    fn flush(&mut self);
}

/// A listener that discards every event; the default for sessions that
/// don't need durability.
#[derive(Debug, Default)]
pub struct NullListener;

impl ChangeListener for NullListener {
    fn vertex_added(&mut self, _node: &Node) {}
    fn vertex_removed(&mut self, _node: &Node) {}
    fn edge_added(&mut self, _edge: &Edge) {}
    fn edge_removed(&mut self, _edge: &Edge) {}
    fn flush(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordedEvent {
    VertexAdded(Locator),
    VertexRemoved(Locator),
    EdgeAdded(Locator),
    EdgeRemoved(Locator),
}

/// A listener that queues events and only exposes them once `flush` is
/// called, matching a listener contract that queues operations and
/// applies them on flush. Useful in tests asserting
/// which structural events a mutation produced.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pending: Vec<RecordedEvent>,
    flushed: Vec<RecordedEvent>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flushed_count(&self) -> usize {
        self.flushed.len()
    }

    pub fn vertex_added_count(&self) -> usize {
        self.flushed
            .iter()
            .filter(|e| matches!(e, RecordedEvent::VertexAdded(_)))
            .count()
    }

    pub fn edge_added_count(&self) -> usize {
        self.flushed
            .iter()
            .filter(|e| matches!(e, RecordedEvent::EdgeAdded(_)))
            .count()
    }
}

impl ChangeListener for RecordingListener {
    fn vertex_added(&mut self, node: &Node) {
        self.pending
            .push(RecordedEvent::VertexAdded(node.locator.clone()));
    }
    fn vertex_removed(&mut self, node: &Node) {
        self.pending
            .push(RecordedEvent::VertexRemoved(node.locator.clone()));
    }
    fn edge_added(&mut self, edge: &Edge) {
        self.pending
            .push(RecordedEvent::EdgeAdded(edge.locator.clone()));
    }
    fn edge_removed(&mut self, edge: &Edge) {
        self.pending
            .push(RecordedEvent::EdgeRemoved(edge.locator.clone()));
    }
    fn flush(&mut self) {
        self.flushed.append(&mut self.pending);
    }
}

/// An in-memory directed multigraph. Self-loops and parallel edges are
/// permitted. Vertex/edge identity is the record's [`Locator`]: two
/// records with the same locator are treated as the same record.
#[derive(Debug, Default)]
pub struct GraphStore {
    vertices: HashMap<Locator, Node>,
    edges: HashMap<Locator, Edge>,
    outgoing: HashMap<Locator, HashSet<Locator>>,
    incoming: HashMap<Locator, HashSet<Locator>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, node: Node, listener: &mut dyn ChangeListener) {
        trace!(locator = %node.locator, "add_vertex");
        let loc = node.locator.clone();
        self.vertices.insert(loc.clone(), node);
        self.outgoing.entry(loc.clone()).or_default();
        self.incoming.entry(loc.clone()).or_default();
        listener.vertex_added(&self.vertices[&loc]);
    }

    /// Remove a vertex and all edges incident to it.
    pub fn remove_vertex(&mut self, locator: &Locator, listener: &mut dyn ChangeListener) {
        let Some(node) = self.vertices.remove(locator) else {
            return;
        };
        trace!(locator = %locator, "remove_vertex");
        let incident: Vec<Locator> = self
            .outgoing
            .get(locator)
            .into_iter()
            .flatten()
            .chain(self.incoming.get(locator).into_iter().flatten())
            .cloned()
            .collect();
        for edge_loc in incident {
            self.remove_edge(&edge_loc, listener);
        }
        self.outgoing.remove(locator);
        self.incoming.remove(locator);
        listener.vertex_removed(&node);
    }

    /// Add an edge. Fails if either endpoint's locator is not present in
    /// the store.
    pub fn add_edge(&mut self, edge: Edge, listener: &mut dyn ChangeListener) -> Result<(), String> {
        if !self.vertices.contains_key(&edge.source.locator) {
            return Err(format!("source {} not present in store", edge.source.locator));
        }
        if !self.vertices.contains_key(&edge.target.locator) {
            return Err(format!("target {} not present in store", edge.target.locator));
        }
        trace!(locator = %edge.locator, "add_edge");
        let loc = edge.locator.clone();
        self.outgoing
            .entry(edge.source.locator.clone())
            .or_default()
            .insert(loc.clone());
        self.incoming
            .entry(edge.target.locator.clone())
            .or_default()
            .insert(loc.clone());
        self.edges.insert(loc.clone(), edge);
        listener.edge_added(&self.edges[&loc]);
        Ok(())
    }

    pub fn remove_edge(&mut self, locator: &Locator, listener: &mut dyn ChangeListener) {
        let Some(edge) = self.edges.remove(locator) else {
            return;
        };
        trace!(locator = %locator, "remove_edge");
        if let Some(set) = self.outgoing.get_mut(&edge.source.locator) {
            set.remove(locator);
        }
        if let Some(set) = self.incoming.get_mut(&edge.target.locator) {
            set.remove(locator);
        }
        listener.edge_removed(&edge);
    }

    pub fn vertex(&self, locator: &Locator) -> Option<&Node> {
        self.vertices.get(locator)
    }

    pub fn edge(&self, locator: &Locator) -> Option<&Edge> {
        self.edges.get(locator)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Node> {
        self.vertices.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn outgoing_edges(&self, locator: &Locator) -> Vec<&Edge> {
        self.outgoing
            .get(locator)
            .into_iter()
            .flatten()
            .filter_map(|l| self.edges.get(l))
            .collect()
    }

    pub fn incoming_edges(&self, locator: &Locator) -> Vec<&Edge> {
        self.incoming
            .get(locator)
            .into_iter()
            .flatten()
            .filter_map(|l| self.edges.get(l))
            .collect()
    }

    /// The union of incoming and outgoing edges for a node version.
    pub fn edges_of(&self, locator: &Locator) -> Vec<&Edge> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for e in self
            .outgoing_edges(locator)
            .into_iter()
            .chain(self.incoming_edges(locator))
        {
            if seen.insert(e.locator.clone()) {
                out.push(e);
            }
        }
        out
    }

    /// All edges whose active version has either endpoint matching `uid`
    /// (any version of that uid), used by the node cascade to find what
    /// needs rewriting without needing the exact prior locator.
    pub fn active_edges_touching_uid(&self, uid: &Uid) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| e.is_active() && e.touches(uid))
            .collect()
    }

    /// All versions of a node uid, ascending by version.
    pub fn node_versions(&self, uid: &Uid) -> Vec<&Node> {
        let mut v: Vec<&Node> = self
            .vertices
            .values()
            .filter(|n| n.locator.uid == *uid)
            .collect();
        v.sort_by_key(|n| n.locator.version);
        v
    }

    pub fn active_node(&self, uid: &Uid) -> Option<&Node> {
        self.vertices.values().find(|n| n.locator.uid == *uid && n.is_active())
    }

    /// Highest version active at `t` (ties on boundary instants break by
    /// highest version).
    pub fn node_at(&self, uid: &Uid, t: crate::entity::Instant) -> Option<&Node> {
        self.node_versions(uid)
            .into_iter()
            .rev()
            .find(|n| n.active_at(t))
    }

    /// All versions of an edge uid, ascending by version.
    pub fn edge_versions(&self, uid: &Uid) -> Vec<&Edge> {
        let mut v: Vec<&Edge> = self.edges.values().filter(|e| e.locator.uid == *uid).collect();
        v.sort_by_key(|e| e.locator.version);
        v
    }

    pub fn active_edge(&self, uid: &Uid) -> Option<&Edge> {
        self.edges.values().find(|e| e.locator.uid == *uid && e.is_active())
    }

    pub fn edge_at(&self, uid: &Uid, t: crate::entity::Instant) -> Option<&Edge> {
        self.edge_versions(uid)
            .into_iter()
            .rev()
            .find(|e| e.active_at(t))
    }

    pub fn all_active_nodes(&self) -> impl Iterator<Item = &Node> {
        self.vertices.values().filter(|n| n.is_active())
    }

    pub fn all_active_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| e.is_active())
    }

    /// A read-only view restricted to the given vertex and edge sets,
    /// used by component validation and as-of queries.
    pub fn induced_subgraph(&self, vertices: &HashSet<Locator>, edges: &HashSet<Locator>) -> InducedSubgraph<'_> {
        InducedSubgraph {
            vertices: vertices
                .iter()
                .filter_map(|l| self.vertices.get(l).map(|n| (l.clone(), n)))
                .collect(),
            edges: edges
                .iter()
                .filter_map(|l| self.edges.get(l).map(|e| (l.clone(), e)))
                .collect(),
        }
    }
}

/// A read-only restriction of a [`GraphStore`] to a given vertex/edge set.
pub struct InducedSubgraph<'a> {
    pub vertices: HashMap<Locator, &'a Node>,
    pub edges: HashMap<Locator, &'a Edge>,
}

impl<'a> InducedSubgraph<'a> {
    /// Weak connectivity: treat every edge as undirected and check that
    /// the vertex set forms a single connected component. An empty vertex
    /// set is considered disconnected (an empty node set is required to be non-empty).
    pub fn is_weakly_connected(&self) -> bool {
        let Some(start) = self.vertices.keys().next() else {
            return false;
        };
        let mut adjacency: HashMap<&Locator, Vec<&Locator>> = HashMap::new();
        for edge in self.edges.values() {
            adjacency
                .entry(&edge.source.locator)
                .or_default()
                .push(&edge.target.locator);
            adjacency
                .entry(&edge.target.locator)
                .or_default()
                .push(&edge.source.locator);
        }
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(cur) = stack.pop() {
            if let Some(neighbors) = adjacency.get(cur) {
                for n in neighbors {
                    if self.vertices.contains_key(*n) && visited.insert(*n) {
                        stack.push(n);
                    }
                }
            }
        }
        visited.len() == self.vertices.len()
    }

    /// Directed-cycle check (treating direction as given) via iterative
    /// DFS with a recursion-stack color marker.
    pub fn is_acyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color: HashMap<&Locator, Color> = self
            .vertices
            .keys()
            .map(|l| (l, Color::White))
            .collect();
        let mut adjacency: HashMap<&Locator, Vec<&Locator>> = HashMap::new();
        for edge in self.edges.values() {
            adjacency
                .entry(&edge.source.locator)
                .or_default()
                .push(&edge.target.locator);
        }

        fn visit<'a>(
            node: &'a Locator,
            adjacency: &HashMap<&'a Locator, Vec<&'a Locator>>,
            color: &mut HashMap<&'a Locator, Color>,
        ) -> bool {
            color.insert(node, Color::Gray);
            if let Some(neighbors) = adjacency.get(node) {
                for &next in neighbors {
                    match color.get(next) {
                        Some(Color::Gray) => return false,
                        Some(Color::White) => {
                            if !visit(next, adjacency, color) {
                                return false;
                            }
                        }
                        _ => {}
                    }
                }
            }
            color.insert(node, Color::Black);
            true
        }

        let keys: Vec<&Locator> = self.vertices.keys().collect();
        for k in keys {
            if color.get(k) == Some(&Color::White) && !visit(k, &adjacency, &mut color) {
                return false;
            }
        }
        true
    }

    /// Every edge's endpoints must be within the declared node set.
    pub fn edges_escape_node_set(&self) -> Option<Locator> {
        for edge in self.edges.values() {
            if !self.vertices.contains_key(&edge.source.locator) {
                return Some(edge.locator.clone());
            }
            if !self.vertices.contains_key(&edge.target.locator) {
                return Some(edge.locator.clone());
            }
        }
        None
    }
}
