//! Maps component uid to its ordered list of versions. Components never
//! back-link to the edges that reference them; membership is always
//! recomputed from the edge index.

use std::collections::HashMap;

use crate::entity::{Component, Instant};
use crate::id::{Locator, Uid};

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    versions: HashMap<Uid, Vec<Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new component version. Versions for a uid are kept sorted
    /// ascending by version number (invariant 1: dense, starting at 1).
    pub fn insert(&mut self, component: Component) {
        let list = self.versions.entry(component.locator.uid.clone()).or_default();
        list.push(component);
        list.sort_by_key(|c| c.locator.version);
    }

    pub fn by_locator(&self, locator: &Locator) -> Option<&Component> {
        self.versions
            .get(&locator.uid)?
            .iter()
            .find(|c| c.locator.version == locator.version)
    }

    pub fn active(&self, uid: &Uid) -> Option<&Component> {
        self.versions.get(uid)?.iter().find(|c| c.is_active())
    }

    pub fn at(&self, uid: &Uid, t: Instant) -> Option<&Component> {
        self.versions
            .get(uid)?
            .iter()
            .rev()
            .find(|c| c.active_at(t))
    }

    pub fn versions(&self, uid: &Uid) -> &[Component] {
        self.versions.get(uid).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn all_active(&self) -> impl Iterator<Item = &Component> {
        self.versions.values().filter_map(|v| v.iter().find(|c| c.is_active()))
    }

    pub fn all_uids(&self) -> impl Iterator<Item = &Uid> {
        self.versions.keys()
    }
}
