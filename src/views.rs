//! Temporal views: reconstructs component membership and entity state as
//! of an arbitrary instant.
//!
//! A component never physically enumerates its elements; every query
//! here recomputes membership from the edge index.

use std::collections::HashSet;

use crate::engine::MutationEngine;
use crate::entity::{Edge, Instant, Node};
use crate::id::{Locator, Uid};

/// Read-only view over a [`MutationEngine`]'s store and registry for
/// as-of reconstruction. Borrows rather than owns, since views never
/// mutate state.
pub struct TemporalViews<'e> {
    engine: &'e MutationEngine,
}

impl<'e> TemporalViews<'e> {
    pub fn new(engine: &'e MutationEngine) -> Self {
        TemporalViews { engine }
    }

    /// All edges whose `component_refs` contains `component`, `created <=
    /// t`, and `expired` is absent or `> t`.
    pub fn edges_as_of(&self, component: &Locator, t: Instant) -> Vec<Edge> {
        self.engine
            .store()
            .all_edges()
            .filter(|e| e.component_refs.contains(component) && e.active_at(t))
            .cloned()
            .collect()
    }

    /// The union of endpoints of `edges_as_of(component, t)`, filtered to
    /// those Node versions that existed at `t`.
    pub fn nodes_as_of(&self, component: &Locator, t: Instant) -> Vec<Node> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for edge in self.edges_as_of(component, t) {
            for node in [*edge.source, *edge.target] {
                if node.active_at(t) && seen.insert(node.locator.clone()) {
                    out.push(node);
                }
            }
        }
        out
    }

    /// The active component set referencing `element_uid` (a node or
    /// edge uid) at `t`. Only edges carry component references in this
    /// model.
    pub fn components_for(&self, element_uid: &Uid, t: Instant) -> Vec<Locator> {
        let Some(edge) = self.engine.store().edge_at(element_uid, t) else {
            return Vec::new();
        };
        edge.component_refs
            .iter()
            .filter(|loc| {
                self.engine
                    .registry()
                    .by_locator(loc)
                    .map(|c| c.active_at(t))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
