use std::collections::BTreeSet;

use bitemporal_graph::data::{Data, DataCodec, JsonCodec, Type};
use bitemporal_graph::engine::MutationEngine;
use bitemporal_graph::entity::Instant;
use bitemporal_graph::views::TemporalViews;
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

/// 1. At most one version active per uid, at any instant.
#[test]
fn invariant_1_at_most_one_active_version() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    engine.node_update(&a.locator.uid, node_type(), Data::empty(), t(2)).unwrap();
    engine.node_update(&a.locator.uid, node_type(), Data::empty(), t(3)).unwrap();

    let active: Vec<_> = engine
        .find_node_versions(&a.locator.uid)
        .into_iter()
        .filter(|n| n.is_active())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].locator.version, 3);
}

/// 2. Versions per uid form a contiguous sequence 1..=n.
#[test]
fn invariant_2_versions_are_dense() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    engine.node_update(&a.locator.uid, node_type(), Data::empty(), t(2)).unwrap();
    engine.node_update(&a.locator.uid, node_type(), Data::empty(), t(3)).unwrap();

    let mut versions: Vec<u32> = engine
        .find_node_versions(&a.locator.uid)
        .iter()
        .map(|n| n.locator.version)
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3]);
}

/// 3. Every edge's endpoints are stored node versions, active at the
/// edge's creation instant.
#[test]
fn invariant_3_edge_endpoints_were_active_at_creation() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let b = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let edge = engine
        .edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(2))
        .unwrap();

    assert!(edge.source.active_at(edge.created));
    assert!(edge.target.active_at(edge.created));
    assert!(engine.find_node(&edge.source.locator).is_ok());
    assert!(engine.find_node(&edge.target.locator).is_ok());
}

/// 4. node.expire cascades expiry onto every incident edge.
#[test]
fn invariant_4_node_expire_cascades_to_incident_edges() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let b = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let edge = engine
        .edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(2))
        .unwrap();

    engine.node_expire(&b.locator.uid, t(3)).unwrap();
    let edge_now = engine.find_edge(&edge.locator).unwrap();
    assert_eq!(edge_now.expired, Some(t(3)));
}

/// 5. node.update replaces every active incident edge with a new version
/// pointing at the new node version, expiring the old edge at t.
#[test]
fn invariant_5_node_update_rewrites_incident_edges() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let b = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let edge_v1 = engine
        .edge_add(edge_type(), &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), t(2))
        .unwrap();

    let b_v2 = engine.node_update(&b.locator.uid, node_type(), Data::empty(), t(3)).unwrap();

    let edge_v1_reloaded = engine.find_edge(&edge_v1.locator).unwrap();
    assert_eq!(edge_v1_reloaded.expired, Some(t(3)));

    let edge_v2 = engine.find_active_edge(&edge_v1.locator.uid).unwrap();
    assert_eq!(edge_v2.target.locator, b_v2.locator);
    assert_eq!(edge_v2.created, t(3));
}

/// 6. component.update rewrites every edge referencing the old locator to
/// reference the new one, on a new edge version.
#[test]
fn invariant_6_component_update_rewrites_referencing_edges() {
    let mut engine = MutationEngine::new();
    let comp = engine.component_add(Type::new("Tag").unwrap(), Data::empty(), t(1)).unwrap();
    let x = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let y = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let mut refs = BTreeSet::new();
    refs.insert(comp.locator.clone());
    let edge_v1 = engine
        .edge_add(edge_type(), &x.locator.uid, &y.locator.uid, Data::empty(), refs, t(1))
        .unwrap();

    let comp_v2 = engine
        .component_update(&comp.locator.uid, Type::new("Tag").unwrap(), Data::empty(), t(2))
        .unwrap();

    let edge_v1_reloaded = engine.find_edge(&edge_v1.locator).unwrap();
    assert_eq!(edge_v1_reloaded.expired, Some(t(2)));

    let edge_v2 = engine.find_active_edge(&edge_v1.locator.uid).unwrap();
    assert!(edge_v2.component_refs.contains(&comp_v2.locator));
    assert!(!edge_v2.component_refs.contains(&comp.locator));
}

/// 7. find_at(uid, t) returns the unique active-at-t version, and is
/// idempotent across repeated calls with the same t.
#[test]
fn invariant_7_find_at_is_idempotent() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    engine.node_update(&a.locator.uid, node_type(), Data::empty(), t(5)).unwrap();

    let first = engine.find_node_at(&a.locator.uid, t(3));
    let second = engine.find_node_at(&a.locator.uid, t(3));
    assert_eq!(first, second);
    assert_eq!(first.unwrap().locator, a.locator);
}

/// 8. edges_as_of(c, T) equals the set of edges whose active-at-T version
/// references c.locator.
#[test]
fn invariant_8_edges_as_of_matches_active_references() {
    let mut engine = MutationEngine::new();
    let comp = engine.component_add(Type::new("Tag").unwrap(), Data::empty(), t(1)).unwrap();
    let x = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let y = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let mut refs = BTreeSet::new();
    refs.insert(comp.locator.clone());
    let edge = engine
        .edge_add(edge_type(), &x.locator.uid, &y.locator.uid, Data::empty(), refs, t(1))
        .unwrap();

    let views = TemporalViews::new(&engine);
    let at_t1 = views.edges_as_of(&comp.locator, t(1));
    let expected: Vec<_> = engine
        .all_active_edges()
        .into_iter()
        .filter(|e| e.component_refs.contains(&comp.locator) && e.active_at(t(1)))
        .collect();
    assert_eq!(at_t1.len(), expected.len());
    assert_eq!(at_t1[0].locator, edge.locator);
}

/// 9. Round-trip: find(locator) after save returns an equal record, and a
/// codec round-trips a payload without loss.
#[test]
fn invariant_9_round_trip_preserves_equality() {
    let mut engine = MutationEngine::new();
    let node = engine
        .node_add(node_type(), Data::new("N", serde_json::json!({"k": "v"})), t(1))
        .unwrap();
    let reloaded = engine.find_node(&node.locator).unwrap();
    assert_eq!(reloaded, node);

    let codec = JsonCodec;
    let encoded = codec.serialize(&node.data).unwrap();
    let decoded = codec.deserialize(encoded).unwrap();
    assert_eq!(decoded, node.data);
}

/// 10. Self-loops are permitted by edge operations but component
/// validation still enforces acyclicity on the declared subgraph.
#[test]
fn invariant_10_self_loops_allowed_in_edges_rejected_by_component_validation() {
    let mut engine = MutationEngine::new();
    let a = engine.node_add(node_type(), Data::empty(), t(1)).unwrap();
    let loop_edge = engine
        .edge_add(edge_type(), &a.locator.uid, &a.locator.uid, Data::empty(), BTreeSet::new(), t(2))
        .unwrap();
    assert!(loop_edge.is_self_loop());

    let nodes = std::iter::once(a.locator.clone()).collect();
    let edges = std::iter::once(loop_edge.locator.clone()).collect();
    let result = engine.validate_component_subgraph(&nodes, &edges);
    assert!(result.is_err());
}
