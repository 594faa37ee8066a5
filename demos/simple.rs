//! Minimal walkthrough: add two nodes, connect them, commit the session.
//! Run with `cargo run --example simple` to see the `tracing` output.

use std::collections::BTreeSet;

use bitemporal_graph::data::{Data, Type};
use bitemporal_graph::session::GraphSession;
use chrono::Utc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut session = GraphSession::new();
    let now = Utc::now();

    let node_ty = Type::new("Station").unwrap();
    let edge_ty = Type::new("CONNECTS").unwrap();

    let a = session.handle().node_add(node_ty.clone(), Data::empty(), now).unwrap();
    let b = session.handle().node_add(node_ty, Data::empty(), now).unwrap();

    session
        .handle()
        .edge_add(edge_ty, &a.locator.uid, &b.locator.uid, Data::empty(), BTreeSet::new(), now)
        .unwrap();

    session.commit().unwrap();

    println!("Successfully created graph with 2 nodes and 1 edge");
}
