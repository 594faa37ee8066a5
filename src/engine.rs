//! The mutation engine: `add`/`update`/`expire` for nodes, edges, and
//! components, with node/edge/component cascade rewrites on update and expiry.
//!
//! Every operation takes a caller-supplied timestamp; the engine never
//! consults the wall clock. A mutation either completes in full or
//! raises — every precondition is checked and every replacement record
//! is built before the first store write, so a raised error never leaves
//! a partially-applied cascade visible to readers.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, instrument};

use crate::data::{Data, Type};
use crate::entity::{Component, Edge, Instant, Node};
use crate::error::{GraphError, GraphResult, NotFoundDetail, ValidationError};
use crate::id::{Locator, Uid};
use crate::registry::ComponentRegistry;
use crate::store::{ChangeListener, GraphStore, NullListener};

/// Owns the in-memory graph store and component registry for one session,
/// and exposes the node/edge/component mutation API, assuming a
/// single-writer, single-threaded scheduling model.
pub struct MutationEngine {
    store: GraphStore,
    registry: ComponentRegistry,
    listener: Box<dyn ChangeListener>,
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationEngine {
    pub fn new() -> Self {
        MutationEngine {
            store: GraphStore::new(),
            registry: ComponentRegistry::new(),
            listener: Box::new(NullListener),
        }
    }

    pub fn with_listener(listener: Box<dyn ChangeListener>) -> Self {
        MutationEngine {
            store: GraphStore::new(),
            registry: ComponentRegistry::new(),
            listener,
        }
    }

    /// Assemble an engine directly from an already-consistent store and
    /// registry, bypassing every cascade rule. Used by
    /// [`crate::builder::GraphBuilder`] when reloading a previously
    /// persisted graph, where the cascades already ran once at write time.
    pub fn from_parts(store: GraphStore, registry: ComponentRegistry) -> Self {
        MutationEngine {
            store,
            registry,
            listener: Box::new(NullListener),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Flush the attached listener's pending events, handing them to
    /// whatever durable backend it wraps. Called by
    /// [`crate::session::GraphSession::commit`].
    pub fn flush_listener(&mut self) {
        self.listener.flush();
    }

    fn check_timestamp_order(&self, created: Instant, expired: Option<Instant>) -> GraphResult<()> {
        if let Some(e) = expired {
            if created > e {
                return Err(GraphError::InvalidTimestamp(format!(
                    "created {created} is after expired {e}"
                )));
            }
        }
        Ok(())
    }

    /// Reject a cascade expiry that would invert `edge`'s temporal window.
    /// Timestamps across calls are not required to be monotone, so a
    /// cascade triggered by an earlier `t` than an edge's own `created`
    /// must be rejected rather than silently producing `created > expired`.
    fn check_edge_cascade_time(&self, edge: &Edge, t: Instant) -> GraphResult<()> {
        if t < edge.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "cascade time {t} precedes edge {} creation {}",
                edge.locator, edge.created
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Node operations
    // ---------------------------------------------------------------

    #[instrument(skip(self, data))]
    pub fn node_add(&mut self, r#type: Type, data: Data, t: Instant) -> GraphResult<Node> {
        let node = Node::new(Locator::first(Uid::new()), r#type, data, t);
        self.check_timestamp_order(node.created, node.expired)?;
        self.store.add_vertex(node.clone(), self.listener.as_mut());
        debug!(locator = %node.locator, "node added");
        Ok(node)
    }

    #[instrument(skip(self, data))]
    pub fn node_update(&mut self, uid: &Uid, r#type: Type, data: Data, t: Instant) -> GraphResult<Node> {
        self.node_update_with_handled(uid, r#type, data, t, &HashSet::new())
    }

    /// Internal entry point so a future nested cascade (nodes do not
    /// reference components, so no caller in this engine ever populates
    /// `handled` with anything) can skip edges a sibling cascade has
    /// already rewritten this mutation.
    fn node_update_with_handled(
        &mut self,
        uid: &Uid,
        r#type: Type,
        data: Data,
        t: Instant,
        handled: &HashSet<Uid>,
    ) -> GraphResult<Node> {
        let active = self
            .store
            .active_node(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "update time {t} precedes node creation {}",
                active.created
            )));
        }

        let incident: Vec<Edge> = self
            .store
            .edges_of(&active.locator)
            .into_iter()
            .filter(|e| e.is_active() && !handled.contains(&e.locator.uid))
            .cloned()
            .collect();
        for edge in &incident {
            self.check_edge_cascade_time(edge, t)?;
        }

        let expired_active = active.expire_twin(t);
        let next = Node::new(active.locator.next(), r#type, data, t);

        self.store.add_vertex(expired_active, self.listener.as_mut());
        self.store.add_vertex(next.clone(), self.listener.as_mut());

        for edge in incident {
            self.rewrite_edge_endpoint(&edge, &active.locator, &next, t)?;
        }

        debug!(old = %active.locator, new = %next.locator, "node updated");
        Ok(next)
    }

    #[instrument(skip(self))]
    pub fn node_expire(&mut self, uid: &Uid, t: Instant) -> GraphResult<Node> {
        let active = self
            .store
            .active_node(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "expire time {t} precedes node creation {}",
                active.created
            )));
        }

        let incident: Vec<Edge> = self
            .store
            .edges_of(&active.locator)
            .into_iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect();

        for edge in &incident {
            self.check_edge_cascade_time(edge, t)?;
        }
        for edge in &incident {
            self.store
                .add_edge(edge.expire_twin(t), self.listener.as_mut())
                .map_err(GraphError::InvariantViolation)?;
        }

        let expired = active.expire_twin(t);
        self.store.add_vertex(expired.clone(), self.listener.as_mut());
        debug!(locator = %expired.locator, incident = incident.len(), "node expired");
        Ok(expired)
    }

    /// Replace `old_endpoint` with `new_endpoint` on `edge`, expiring the
    /// old edge version at `t` and inserting the rewritten successor.
    /// Used by the node-update cascade.
    fn rewrite_edge_endpoint(
        &mut self,
        edge: &Edge,
        old_endpoint: &Locator,
        new_endpoint: &Node,
        t: Instant,
    ) -> GraphResult<()> {
        self.check_edge_cascade_time(edge, t)?;

        let new_source = if edge.source.locator == *old_endpoint {
            new_endpoint.clone()
        } else {
            (*edge.source).clone()
        };
        let new_target = if edge.target.locator == *old_endpoint {
            new_endpoint.clone()
        } else {
            (*edge.target).clone()
        };

        self.store
            .add_edge(edge.expire_twin(t), self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;

        let next = Edge::new(
            edge.locator.next(),
            edge.r#type.clone(),
            new_source,
            new_target,
            edge.data.clone(),
            edge.component_refs.clone(),
            t,
        );
        self.store
            .add_edge(next, self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Edge operations
    // ---------------------------------------------------------------

    #[instrument(skip(self, data, component_refs))]
    #[allow(clippy::too_many_arguments)]
    pub fn edge_add(
        &mut self,
        r#type: Type,
        source_uid: &Uid,
        target_uid: &Uid,
        data: Data,
        component_refs: BTreeSet<Locator>,
        t: Instant,
    ) -> GraphResult<Edge> {
        let source = self
            .store
            .active_node(source_uid)
            .cloned()
            .ok_or_else(|| GraphError::InvalidArgument(format!("source {source_uid} has no active version")))?;
        if !source.active_at(t) {
            return Err(GraphError::InvalidArgument(format!(
                "source {source_uid} was not active at {t}"
            )));
        }
        let target = self
            .store
            .active_node(target_uid)
            .cloned()
            .ok_or_else(|| GraphError::InvalidArgument(format!("target {target_uid} has no active version")))?;
        if !target.active_at(t) {
            return Err(GraphError::InvalidArgument(format!(
                "target {target_uid} was not active at {t}"
            )));
        }

        for loc in &component_refs {
            let component = self.registry.by_locator(loc).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "component_refs entry {loc} does not resolve to a known component version"
                ))
            })?;
            if !component.active_at(t) {
                return Err(GraphError::InvalidArgument(format!(
                    "component_refs entry {loc} was not active at {t}"
                )));
            }
        }

        let edge = Edge::new(Locator::first(Uid::new()), r#type, source, target, data, component_refs, t);
        self.store
            .add_edge(edge.clone(), self.listener.as_mut())
            .map_err(GraphError::InvalidArgument)?;
        debug!(locator = %edge.locator, "edge added");
        Ok(edge)
    }

    #[instrument(skip(self, data, component_refs))]
    pub fn edge_update(
        &mut self,
        uid: &Uid,
        r#type: Type,
        data: Data,
        component_refs: BTreeSet<Locator>,
        t: Instant,
    ) -> GraphResult<Edge> {
        let active = self
            .store
            .active_edge(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "update time {t} precedes edge creation {}",
                active.created
            )));
        }

        self.store
            .add_edge(active.expire_twin(t), self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;

        let next = Edge::new(
            active.locator.next(),
            r#type,
            (*active.source).clone(),
            (*active.target).clone(),
            data,
            component_refs,
            t,
        );
        self.store
            .add_edge(next.clone(), self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;
        debug!(old = %active.locator, new = %next.locator, "edge updated");
        Ok(next)
    }

    #[instrument(skip(self))]
    pub fn edge_expire(&mut self, uid: &Uid, t: Instant) -> GraphResult<Edge> {
        let active = self
            .store
            .active_edge(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "expire time {t} precedes edge creation {}",
                active.created
            )));
        }
        let twin = active.expire_twin(t);
        self.store
            .add_edge(twin.clone(), self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;
        debug!(locator = %twin.locator, "edge expired");
        Ok(twin)
    }

    // ---------------------------------------------------------------
    // Component operations
    // ---------------------------------------------------------------

    #[instrument(skip(self, data))]
    pub fn component_add(&mut self, r#type: Type, data: Data, t: Instant) -> GraphResult<Component> {
        let component = Component::new(Locator::first(Uid::new()), r#type, data, t);
        self.registry.insert(component.clone());
        debug!(locator = %component.locator, "component added");
        Ok(component)
    }

    #[instrument(skip(self, data))]
    pub fn component_update(&mut self, uid: &Uid, r#type: Type, data: Data, t: Instant) -> GraphResult<Component> {
        let active = self
            .registry
            .active(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "update time {t} precedes component creation {}",
                active.created
            )));
        }

        // 1. Enumerate edges whose active version references this exact
        // component locator, before any mutation.
        let referencing: Vec<Edge> = self
            .store
            .all_active_edges()
            .filter(|e| e.component_refs.contains(&active.locator))
            .cloned()
            .collect();
        for edge in &referencing {
            self.check_edge_cascade_time(edge, t)?;
        }

        // 2-3. Replace c with its expired twin, insert c'.
        let expired = active.expire_twin(t);
        let next = Component::new(active.locator.next(), r#type, data, t);
        self.registry.insert(expired);
        self.registry.insert(next.clone());

        // 4. Rewrite each referencing edge exactly once.
        let mut handled = HashSet::new();
        for edge in referencing {
            self.rewrite_edge_component_ref(&edge, &active.locator, &next.locator, t)?;
            handled.insert(edge.locator.uid.clone());
        }
        // Nodes never carry component references in this model, so
        // there is no further traversal here —
        // `handled` exists only to prove to a node-update cascade nested
        // in the same mutation that these edges are already current; no
        // such nesting occurs in this engine, since component updates
        // never call `node_update_with_handled`.
        debug!(old = %active.locator, new = %next.locator, rewritten = handled.len(), "component updated");
        Ok(next)
    }

    fn rewrite_edge_component_ref(
        &mut self,
        edge: &Edge,
        old_ref: &Locator,
        new_ref: &Locator,
        t: Instant,
    ) -> GraphResult<()> {
        self.check_edge_cascade_time(edge, t)?;

        self.store
            .add_edge(edge.expire_twin(t), self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;

        let mut refs = edge.component_refs.clone();
        refs.remove(old_ref);
        refs.insert(new_ref.clone());

        let next = Edge::new(
            edge.locator.next(),
            edge.r#type.clone(),
            (*edge.source).clone(),
            (*edge.target).clone(),
            edge.data.clone(),
            refs,
            t,
        );
        self.store
            .add_edge(next, self.listener.as_mut())
            .map_err(GraphError::InvariantViolation)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn component_expire(&mut self, uid: &Uid, t: Instant) -> GraphResult<Component> {
        let active = self
            .registry
            .active(uid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Uid(uid.clone())))?;
        if t < active.created {
            return Err(GraphError::InvalidTimestamp(format!(
                "expire time {t} precedes component creation {}",
                active.created
            )));
        }
        let twin = active.expire_twin(t);
        self.registry.insert(twin.clone());
        // Edges referencing it are deliberately left untouched; their
        // references become dangling-to-expired, which queries surface
        // as such rather than being silently cleaned up.
        debug!(locator = %twin.locator, "component expired");
        Ok(twin)
    }

    // ---------------------------------------------------------------
    // Validation hook for user-constructed components
    // ---------------------------------------------------------------

    pub fn validate_component_subgraph(
        &self,
        node_locators: &HashSet<Locator>,
        edge_locators: &HashSet<Locator>,
    ) -> Result<(), ValidationError> {
        if node_locators.is_empty() {
            return Err(ValidationError::Empty);
        }
        let induced = self.store.induced_subgraph(node_locators, edge_locators);
        if let Some(escaping) = induced.edges_escape_node_set() {
            return Err(ValidationError::LeafNotInNodeSet(escaping));
        }
        if !induced.is_weakly_connected() {
            return Err(ValidationError::Disconnected);
        }
        if !induced.is_acyclic() {
            return Err(ValidationError::Cyclic);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Finders
    // ---------------------------------------------------------------

    pub fn find_active_node(&self, uid: &Uid) -> Option<Node> {
        self.store.active_node(uid).cloned()
    }

    pub fn find_node_at(&self, uid: &Uid, t: Instant) -> Option<Node> {
        self.store.node_at(uid, t).cloned()
    }

    pub fn find_node(&self, locator: &Locator) -> GraphResult<Node> {
        self.store
            .vertex(locator)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Locator(locator.clone())))
    }

    pub fn find_node_versions(&self, uid: &Uid) -> Vec<Node> {
        self.store.node_versions(uid).into_iter().cloned().collect()
    }

    pub fn all_active_nodes(&self) -> Vec<Node> {
        self.store.all_active_nodes().cloned().collect()
    }

    pub fn find_active_edge(&self, uid: &Uid) -> Option<Edge> {
        self.store.active_edge(uid).cloned()
    }

    pub fn find_edge_at(&self, uid: &Uid, t: Instant) -> Option<Edge> {
        self.store.edge_at(uid, t).cloned()
    }

    pub fn find_edge(&self, locator: &Locator) -> GraphResult<Edge> {
        self.store
            .edge(locator)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Locator(locator.clone())))
    }

    pub fn find_edge_versions(&self, uid: &Uid) -> Vec<Edge> {
        self.store.edge_versions(uid).into_iter().cloned().collect()
    }

    pub fn all_active_edges(&self) -> Vec<Edge> {
        self.store.all_active_edges().cloned().collect()
    }

    pub fn find_active_component(&self, uid: &Uid) -> Option<Component> {
        self.registry.active(uid).cloned()
    }

    pub fn find_component_at(&self, uid: &Uid, t: Instant) -> Option<Component> {
        self.registry.at(uid, t).cloned()
    }

    pub fn find_component(&self, locator: &Locator) -> GraphResult<Component> {
        self.registry
            .by_locator(locator)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(NotFoundDetail::Locator(locator.clone())))
    }

    pub fn find_component_versions(&self, uid: &Uid) -> Vec<Component> {
        self.registry.versions(uid).to_vec()
    }

    pub fn all_active_components(&self) -> Vec<Component> {
        self.registry.all_active().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn t(secs: i64) -> Instant {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn node_type() -> Type {
        Type::new("N").unwrap()
    }

    fn edge_type() -> Type {
        Type::new("E").unwrap()
    }

    #[test]
    fn node_update_rejects_cascade_time_before_incident_edge_creation() {
        let mut engine = MutationEngine::new();
        let a = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let b = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        engine
            .edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(10))
            .unwrap();

        let result = engine.node_update(&b.locator.uid, node_type(), Data::empty(), t(5));
        assert!(matches!(result, Err(GraphError::InvalidTimestamp(_))));
    }

    #[test]
    fn node_expire_rejects_cascade_time_before_incident_edge_creation() {
        let mut engine = MutationEngine::new();
        let a = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let b = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        engine
            .edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(10))
            .unwrap();

        let result = engine.node_expire(&b.locator.uid, t(5));
        assert!(matches!(result, Err(GraphError::InvalidTimestamp(_))));
    }

    #[test]
    fn component_update_rejects_cascade_time_before_referencing_edge_creation() {
        let mut engine = MutationEngine::new();
        let comp = engine.component_add(Type::new("Tag").unwrap(), Data::empty(), t(0)).unwrap();
        let x = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let y = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let mut refs = BTreeSet::new();
        refs.insert(comp.locator.clone());
        engine
            .edge_add(edge_type(), &x.locator.uid, &y.locator.uid, Data::empty(), refs, t(10))
            .unwrap();

        let result = engine.component_update(&comp.locator.uid, Type::new("Tag").unwrap(), Data::empty(), t(5));
        assert!(matches!(result, Err(GraphError::InvalidTimestamp(_))));
    }

    #[test]
    fn edge_add_rejects_endpoint_not_active_at_t() {
        let mut engine = MutationEngine::new();
        let a = engine.node_add(node_type(), Data::empty(), t(100)).unwrap();
        let b = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();

        let result = engine.edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(5));
        assert!(matches!(result, Err(GraphError::InvalidArgument(_))));
    }

    #[test]
    fn edge_add_rejects_component_ref_not_active_at_t() {
        let mut engine = MutationEngine::new();
        let comp = engine.component_add(Type::new("Tag").unwrap(), Data::empty(), t(0)).unwrap();
        engine
            .component_expire(&comp.locator.uid, t(3))
            .unwrap();
        let a = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let b = engine.node_add(node_type(), Data::empty(), t(0)).unwrap();
        let mut refs = BTreeSet::new();
        refs.insert(comp.locator.clone());

        let result = engine.edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), refs, t(10));
        assert!(matches!(result, Err(GraphError::InvalidArgument(_))));
    }
}
