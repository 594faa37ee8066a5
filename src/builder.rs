//! Bulk-construction facade for loading a previously-persisted graph
//! without re-running the mutation engine's cascade logic.
//!
//! A [`GraphBuilder`] accepts whole batches of [`Node`], [`Edge`], and
//! [`Component`] records — typically read back from a repository
//! implementation — and assembles them directly into a [`GraphStore`] and
//! [`ComponentRegistry`]. It checks the structural invariants that don't
//! depend on a cascade having run (dense versions, `created <= expired`,
//! edge endpoints present and active at edge creation), but does not
//! re-verify the cascade invariants; those are guaranteed by whichever
//! mutation engine produced the records in the first place.

use crate::engine::MutationEngine;
use crate::entity::{Component, Edge, Node};
use crate::id::Uid;
use crate::registry::ComponentRegistry;
use crate::store::{GraphStore, NullListener};

/// Why a batch of records was rejected by [`GraphBuilder::build`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("node {0} has non-dense version numbers")]
    NonDenseNodeVersions(Uid),
    #[error("edge {0} has non-dense version numbers")]
    NonDenseEdgeVersions(Uid),
    #[error("component {0} has non-dense version numbers")]
    NonDenseComponentVersions(Uid),
    #[error("record {0} has created after expired")]
    InvertedWindow(Uid),
    #[error("edge {0} endpoint is missing from the supplied node set")]
    MissingEndpoint(Uid),
    #[error("edge {0} was created before one of its endpoints existed")]
    EndpointNotYetActive(Uid),
}

/// Accumulates records before a single validated assembly pass.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    components: Vec<Component>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn add_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn add_edges(mut self, edges: impl IntoIterator<Item = Edge>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn add_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn add_components(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        self.components.extend(components);
        self
    }

    /// Validate structural invariants and assemble a [`MutationEngine`]
    /// whose store and registry hold exactly the supplied records.
    pub fn build(self) -> Result<MutationEngine, BuildError> {
        check_dense_versions(
            self.nodes.iter().map(|n| &n.locator),
            BuildError::NonDenseNodeVersions,
        )?;
        check_dense_versions(
            self.edges.iter().map(|e| &e.locator),
            BuildError::NonDenseEdgeVersions,
        )?;
        check_dense_versions(
            self.components.iter().map(|c| &c.locator),
            BuildError::NonDenseComponentVersions,
        )?;

        for node in &self.nodes {
            if let Some(e) = node.expired {
                if node.created > e {
                    return Err(BuildError::InvertedWindow(node.locator.uid.clone()));
                }
            }
        }
        for edge in &self.edges {
            if let Some(e) = edge.expired {
                if edge.created > e {
                    return Err(BuildError::InvertedWindow(edge.locator.uid.clone()));
                }
            }
        }
        for component in &self.components {
            if let Some(e) = component.expired {
                if component.created > e {
                    return Err(BuildError::InvertedWindow(component.locator.uid.clone()));
                }
            }
        }

        let mut store = GraphStore::new();
        let mut listener = NullListener;
        for node in &self.nodes {
            store.add_vertex(node.clone(), &mut listener);
        }
        for edge in &self.edges {
            if store.vertex(&edge.source.locator).is_none() || store.vertex(&edge.target.locator).is_none() {
                return Err(BuildError::MissingEndpoint(edge.locator.uid.clone()));
            }
            if !edge.source.active_at(edge.created) || !edge.target.active_at(edge.created) {
                return Err(BuildError::EndpointNotYetActive(edge.locator.uid.clone()));
            }
            store
                .add_edge(edge.clone(), &mut listener)
                .map_err(|_| BuildError::MissingEndpoint(edge.locator.uid.clone()))?;
        }

        let mut registry = ComponentRegistry::new();
        for component in self.components {
            registry.insert(component);
        }

        Ok(MutationEngine::from_parts(store, registry))
    }
}

fn check_dense_versions<'a>(
    locators: impl Iterator<Item = &'a crate::id::Locator>,
    err: impl Fn(Uid) -> BuildError,
) -> Result<(), BuildError> {
    use std::collections::HashMap;
    let mut by_uid: HashMap<Uid, Vec<u32>> = HashMap::new();
    for loc in locators {
        by_uid.entry(loc.uid.clone()).or_default().push(loc.version);
    }
    for (uid, mut versions) in by_uid {
        versions.sort_unstable();
        let dense = versions.iter().enumerate().all(|(i, &v)| v == (i as u32) + 1);
        if !dense {
            return Err(err(uid));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Data, Type};
    use crate::id::Locator;
    use chrono::DateTime;

    fn t(secs: i64) -> crate::entity::Instant {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn builds_a_consistent_store_from_loaded_records() {
        let a = Node::new(Locator::first(Uid::new()), Type::new("N").unwrap(), Data::empty(), t(0));
        let b = Node::new(Locator::first(Uid::new()), Type::new("N").unwrap(), Data::empty(), t(0));
        let edge = Edge::new(
            Locator::first(Uid::new()),
            Type::new("E").unwrap(),
            a.clone(),
            b.clone(),
            Data::empty(),
            Default::default(),
            t(1),
        );
        let engine = GraphBuilder::new()
            .add_nodes([a.clone(), b.clone()])
            .add_edge(edge.clone())
            .build()
            .unwrap();
        assert!(engine.find_active_node(&a.locator.uid).is_some());
        assert!(engine.find_active_edge(&edge.locator.uid).is_some());
    }

    #[test]
    fn rejects_edge_referencing_missing_endpoint() {
        let a = Node::new(Locator::first(Uid::new()), Type::new("N").unwrap(), Data::empty(), t(0));
        let ghost = Node::new(Locator::first(Uid::new()), Type::new("N").unwrap(), Data::empty(), t(0));
        let edge = Edge::new(
            Locator::first(Uid::new()),
            Type::new("E").unwrap(),
            a.clone(),
            ghost,
            Data::empty(),
            Default::default(),
            t(1),
        );
        let result = GraphBuilder::new().add_node(a).add_edge(edge).build();
        assert!(matches!(result, Err(BuildError::MissingEndpoint(_))));
    }

    #[test]
    fn rejects_non_dense_versions() {
        let uid = Uid::new();
        let v1 = Node::new(Locator::first(uid.clone()), Type::new("N").unwrap(), Data::empty(), t(0));
        let v3 = Node::new(Locator::new(uid, 3), Type::new("N").unwrap(), Data::empty(), t(1));
        let result = GraphBuilder::new().add_nodes([v1, v3]).build();
        assert!(matches!(result, Err(BuildError::NonDenseNodeVersions(_))));
    }
}
