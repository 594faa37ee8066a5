//! Immutable entity records: [`Node`], [`Edge`], [`Component`], and the
//! [`Path`] / [`Element`] result types that queries hand back to callers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Data, Type};
use crate::id::Locator;

/// A point in time at which a mutation or query is evaluated. The core
/// never consults the wall clock itself; every `Instant`
/// used by the mutation engine is supplied by the caller.
pub type Instant = DateTime<Utc>;

/// A vertex in the graph. Immutable once inserted into the store —
/// "expiring" a node replaces its record with a new one that only differs
/// in `expired`, rather than mutating the existing record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub locator: Locator,
    pub r#type: Type,
    pub data: Data,
    pub created: Instant,
    pub expired: Option<Instant>,
}

impl Node {
    pub fn new(locator: Locator, r#type: Type, data: Data, created: Instant) -> Self {
        Node {
            locator,
            r#type,
            data,
            created,
            expired: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }

    /// Whether this version existed (was active) at `t`: `created <= t <
    /// expired_or_infinity`.
    pub fn active_at(&self, t: Instant) -> bool {
        self.created <= t && self.expired.map_or(true, |e| t < e)
    }

    /// Return the expired twin of this node, tombstoned at `t`. Does not
    /// mutate `self` — per invariant 6, a record is never modified
    /// field-wise.
    pub fn expire_twin(&self, t: Instant) -> Node {
        Node {
            expired: Some(t),
            ..self.clone()
        }
    }
}

/// A directed arc between two specific Node *versions*. Holds strong
/// (owned) references to its endpoint Node records rather than just their
/// locators, per the data model's ownership rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub locator: Locator,
    pub r#type: Type,
    pub source: Box<Node>,
    pub target: Box<Node>,
    pub data: Data,
    pub component_refs: BTreeSet<Locator>,
    pub created: Instant,
    pub expired: Option<Instant>,
}

impl Edge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        locator: Locator,
        r#type: Type,
        source: Node,
        target: Node,
        data: Data,
        component_refs: BTreeSet<Locator>,
        created: Instant,
    ) -> Self {
        Edge {
            locator,
            r#type,
            source: Box::new(source),
            target: Box::new(target),
            data,
            component_refs,
            created,
            expired: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }

    pub fn active_at(&self, t: Instant) -> bool {
        self.created <= t && self.expired.map_or(true, |e| t < e)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source.locator.uid == self.target.locator.uid
    }

    pub fn expire_twin(&self, t: Instant) -> Edge {
        Edge {
            expired: Some(t),
            ..self.clone()
        }
    }

    /// Whether this edge's endpoints touch the given node uid, on either
    /// side.
    pub fn touches(&self, uid: &crate::id::Uid) -> bool {
        self.source.locator.uid == *uid || self.target.locator.uid == *uid
    }
}

/// A pure metadata entity tagging a subset of edges. Does not physically
/// enumerate its elements — membership is always recomputed from the
/// edge index (see [`crate::views`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub locator: Locator,
    pub r#type: Type,
    pub data: Data,
    pub created: Instant,
    pub expired: Option<Instant>,
}

impl Component {
    pub fn new(locator: Locator, r#type: Type, data: Data, created: Instant) -> Self {
        Component {
            locator,
            r#type,
            data,
            created,
            expired: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }

    pub fn active_at(&self, t: Instant) -> bool {
        self.created <= t && self.expired.map_or(true, |e| t < e)
    }

    pub fn expire_twin(&self, t: Instant) -> Component {
        Component {
            expired: Some(t),
            ..self.clone()
        }
    }
}

/// Sum type over the two kinds of graph element a component subgraph (or
/// a path) may contain. Deliberately not unified with `Component` —
/// components are not elements in this model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Node(Node),
    Edge(Edge),
}

impl Element {
    pub fn locator(&self) -> &Locator {
        match self {
            Element::Node(n) => &n.locator,
            Element::Edge(e) => &e.locator,
        }
    }
}

/// Result of a path query: an ordered sequence alternating Node, Edge,
/// Node, ..., Node. Holds the exact Node/Edge versions used so callers
/// see the temporally coherent snapshot they queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    steps: Vec<PathStep>,
}

/// One alternating slot of a [`Path`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathStep {
    Node(Node),
    Edge(Edge),
}

impl Path {
    /// Construct a path from a starting node and a sequence of
    /// (edge, next_node) hops. Panics if called with inconsistent
    /// endpoints; only path-operation code that has already validated
    /// adjacency should call this.
    pub fn new(start: Node, hops: Vec<(Edge, Node)>) -> Self {
        let mut steps = Vec::with_capacity(1 + hops.len() * 2);
        steps.push(PathStep::Node(start));
        for (edge, node) in hops {
            steps.push(PathStep::Edge(edge));
            steps.push(PathStep::Node(node));
        }
        Path { steps }
    }

    /// A path consisting of a single node and no edges (the degenerate
    /// source == target case).
    pub fn single(node: Node) -> Self {
        Path {
            steps: vec![PathStep::Node(node)],
        }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.steps.iter().filter_map(|s| match s {
            PathStep::Node(n) => Some(n),
            PathStep::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.steps.iter().filter_map(|s| match s {
            PathStep::Edge(e) => Some(e),
            PathStep::Node(_) => None,
        })
    }

    /// The elements (nodes and edges) that make up this path, in order.
    pub fn elements(&self) -> Vec<Element> {
        self.steps
            .iter()
            .map(|s| match s {
                PathStep::Node(n) => Element::Node(n.clone()),
                PathStep::Edge(e) => Element::Edge(e.clone()),
            })
            .collect()
    }

    pub fn len_edges(&self) -> usize {
        self.edges().count()
    }
}

/// A loader capable of resolving an [`Unloaded`](Ref::Unloaded) reference
/// on demand. Kept as a boxed `Fn` so the public API is not precluded
/// from lazy/remote resolution even though the in-memory core always
/// hands back [`Ref::Loaded`] values.
pub type Loader<T> = std::sync::Arc<dyn Fn(&Locator) -> Option<T> + Send + Sync>;

/// A possibly-unresolved reference to an entity version. Equality is by
/// locator only, regardless of whether either side is loaded.
#[derive(Clone)]
pub enum Ref<T> {
    Loaded(T),
    Unloaded(Locator, Loader<T>),
}

impl<T> Ref<T> {
    pub fn locator(&self) -> &Locator
    where
        T: HasLocator,
    {
        match self {
            Ref::Loaded(t) => t.locator(),
            Ref::Unloaded(loc, _) => loc,
        }
    }

    /// Resolve this reference, invoking the loader if necessary.
    pub fn resolve(self) -> Option<T> {
        match self {
            Ref::Loaded(t) => Some(t),
            Ref::Unloaded(loc, loader) => loader(&loc),
        }
    }
}

impl<T> std::fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Loaded(_) => write!(f, "Ref::Loaded(..)"),
            Ref::Unloaded(loc, _) => write!(f, "Ref::Unloaded({loc})"),
        }
    }
}

impl<T: HasLocator> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.locator_only() == other.locator_only()
    }
}

impl<T: HasLocator> Ref<T> {
    fn locator_only(&self) -> &Locator {
        match self {
            Ref::Loaded(t) => t.locator(),
            Ref::Unloaded(loc, _) => loc,
        }
    }
}

/// Entities addressable by a [`Locator`], for use with [`Ref`].
pub trait HasLocator {
    fn locator(&self) -> &Locator;
}

/// Common shape of a versioned entity record, used by the repository
/// contract to treat nodes, edges, and components uniformly.
pub trait VersionedEntity: HasLocator + Clone {
    fn created(&self) -> Instant;
    fn expired(&self) -> Option<Instant>;
    fn is_active(&self) -> bool {
        self.expired().is_none()
    }
    fn active_at(&self, t: Instant) -> bool {
        self.created() <= t && self.expired().map_or(true, |e| t < e)
    }
    /// An expired twin of this record at `t`, same locator otherwise.
    fn with_expiry(&self, t: Instant) -> Self;
}

impl VersionedEntity for Node {
    fn created(&self) -> Instant {
        self.created
    }
    fn expired(&self) -> Option<Instant> {
        self.expired
    }
    fn with_expiry(&self, t: Instant) -> Self {
        self.expire_twin(t)
    }
}

impl VersionedEntity for Edge {
    fn created(&self) -> Instant {
        self.created
    }
    fn expired(&self) -> Option<Instant> {
        self.expired
    }
    fn with_expiry(&self, t: Instant) -> Self {
        self.expire_twin(t)
    }
}

impl VersionedEntity for Component {
    fn created(&self) -> Instant {
        self.created
    }
    fn expired(&self) -> Option<Instant> {
        self.expired
    }
    fn with_expiry(&self, t: Instant) -> Self {
        self.expire_twin(t)
    }
}

impl HasLocator for Node {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl HasLocator for Edge {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl HasLocator for Component {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Uid;

    fn t(secs: i64) -> Instant {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn node_active_at_is_half_open() {
        let mut n = Node::new(
            Locator::first(Uid::new()),
            Type::new("Person").unwrap(),
            Data::empty(),
            t(10),
        );
        assert!(!n.active_at(t(5)));
        assert!(n.active_at(t(10)));
        n.expired = Some(t(20));
        assert!(n.active_at(t(19)));
        assert!(!n.active_at(t(20)));
    }

    #[test]
    fn expire_twin_preserves_locator_and_fields() {
        let n = Node::new(
            Locator::first(Uid::new()),
            Type::new("Person").unwrap(),
            Data::empty(),
            t(0),
        );
        let twin = n.expire_twin(t(5));
        assert_eq!(twin.locator, n.locator);
        assert_eq!(twin.expired, Some(t(5)));
        assert!(n.expired.is_none());
    }
}
