//! # bitemporal_graph
//!
//! A bitemporal, versioned property-graph engine. Every node, edge, and
//! component is immutable once written; "updating" or "expiring" a record
//! inserts a new version rather than mutating anything in place, so every
//! prior state remains queryable by an as-of instant.
//!
//! ## Model
//!
//! - [`id::Uid`] names a logical entity across all of its versions;
//!   [`id::Locator`] names one specific version.
//! - [`entity::Node`] and [`entity::Edge`] make up an in-memory directed
//!   multigraph ([`store::GraphStore`]); self-loops and parallel edges are
//!   permitted.
//! - [`entity::Component`] tags a subset of edges without physically
//!   enumerating them — membership is always recomputed from the edge
//!   index via [`views::TemporalViews`].
//! - [`engine::MutationEngine`] is the sole entry point for mutation: it
//!   owns the cascade discipline (node update/expire rewrites incident
//!   edges; component update rewrites referencing edges) and guarantees a
//!   mutation either completes in full or leaves the prior state
//!   untouched.
//! - [`paths::PathGraph`] answers connectivity and path queries over the
//!   currently-active subgraph using `petgraph`.
//! - [`repository::Repository`] and [`session::GraphSession`] are the
//!   seams a durable backend plugs into; [`builder::GraphBuilder`]
//!   reloads a graph from persisted records without re-running cascades.
//!
//! ## Example
//!
//! ```
//! use bitemporal_graph::data::{Data, Type};
//! use bitemporal_graph::session::GraphSession;
//! use chrono::DateTime;
//!
//! let t0 = DateTime::from_timestamp(0, 0).unwrap();
//! let mut session = GraphSession::new();
//! let engine = session.handle();
//!
//! let alice = engine.node_add(Type::new("Person").unwrap(), Data::empty(), t0).unwrap();
//! let bob = engine.node_add(Type::new("Person").unwrap(), Data::empty(), t0).unwrap();
//! engine
//!     .edge_add(
//!         Type::new("KNOWS").unwrap(),
//!         &alice.locator.uid,
//!         &bob.locator.uid,
//!         Data::empty(),
//!         Default::default(),
//!         t0,
//!     )
//!     .unwrap();
//!
//! session.commit().unwrap();
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod data;
pub mod engine;
pub mod entity;
pub mod error;
pub mod id;
pub mod paths;
pub mod registry;
pub mod repository;
pub mod session;
pub mod store;
pub mod views;

/// Common imports for working with the engine.
pub mod prelude {
    pub use crate::builder::{BuildError, GraphBuilder};
    pub use crate::data::{Data, DataCodec, JsonCodec, PropertyCodec, Type};
    pub use crate::engine::MutationEngine;
    pub use crate::entity::{Component, Edge, Element, Instant, Node, Path};
    pub use crate::error::{GraphError, GraphResult};
    pub use crate::id::{Locator, Uid};
    pub use crate::paths::PathGraph;
    pub use crate::repository::{InMemoryRepository, Repository};
    pub use crate::session::GraphSession;
    pub use crate::store::{ChangeListener, GraphStore};
    pub use crate::views::TemporalViews;
}
