//! Abstract persistence contract and its in-memory reference
//! implementation. The core calls through this trait to persist and
//! retrieve versions; the SQL/document/property-graph backends named as
//! deliberately out of scope here would implement it instead.

use std::collections::HashMap;

use crate::entity::{Instant, VersionedEntity};
use crate::error::RepositoryError;
use crate::id::{Locator, Uid};

/// One repository per entity kind (Node, Edge, or Component).
pub trait Repository<T: VersionedEntity> {
    fn save(&mut self, entity: T) -> Result<(), RepositoryError>;
    fn find_active(&self, uid: &Uid) -> Option<T>;
    fn find_at(&self, uid: &Uid, instant: Instant) -> Option<T>;
    fn find(&self, locator: &Locator) -> Result<T, RepositoryError>;
    fn find_versions(&self, uid: &Uid) -> Vec<T>;
    fn expire(&mut self, uid: &Uid, instant: Instant) -> bool;
    fn delete(&mut self, uid: &Uid) -> bool;
    fn all_ids(&self) -> Vec<Uid>;
    fn all_active_ids(&self) -> Vec<Uid>;
}

/// Fully in-memory reference implementation, generic over any
/// [`VersionedEntity`]. Sufficient to exercise every behavior the core
/// specifies, and used directly by [`crate::session`] when
/// no durable backend is wired in.
#[derive(Debug, Default)]
pub struct InMemoryRepository<T> {
    versions: HashMap<Uid, Vec<T>>,
}

impl<T: VersionedEntity> InMemoryRepository<T> {
    pub fn new() -> Self {
        InMemoryRepository {
            versions: HashMap::new(),
        }
    }
}

impl<T: VersionedEntity> Repository<T> for InMemoryRepository<T> {
    fn save(&mut self, entity: T) -> Result<(), RepositoryError> {
        let locator = entity.locator().clone();
        let list = self.versions.entry(locator.uid.clone()).or_default();
        if list.iter().any(|e| e.locator() == &locator) {
            return Err(RepositoryError::DuplicateLocator(locator));
        }
        list.push(entity);
        list.sort_by_key(|e| e.locator().version);
        Ok(())
    }

    fn find_active(&self, uid: &Uid) -> Option<T> {
        self.versions.get(uid)?.iter().find(|e| e.is_active()).cloned()
    }

    fn find_at(&self, uid: &Uid, instant: Instant) -> Option<T> {
        self.versions
            .get(uid)?
            .iter()
            .rev()
            .find(|e| e.active_at(instant))
            .cloned()
    }

    fn find(&self, locator: &Locator) -> Result<T, RepositoryError> {
        self.versions
            .get(&locator.uid)
            .and_then(|list| list.iter().find(|e| e.locator() == locator))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(locator.clone()))
    }

    fn find_versions(&self, uid: &Uid) -> Vec<T> {
        self.versions.get(uid).cloned().unwrap_or_default()
    }

    fn expire(&mut self, uid: &Uid, instant: Instant) -> bool {
        let Some(list) = self.versions.get_mut(uid) else {
            return false;
        };
        let Some(pos) = list.iter().position(|e| e.is_active()) else {
            return false;
        };
        let twin = list[pos].with_expiry(instant);
        list[pos] = twin;
        true
    }

    fn delete(&mut self, uid: &Uid) -> bool {
        self.versions.remove(uid).is_some()
    }

    fn all_ids(&self) -> Vec<Uid> {
        self.versions.keys().cloned().collect()
    }

    fn all_active_ids(&self) -> Vec<Uid> {
        self.versions
            .iter()
            .filter(|(_, list)| list.iter().any(|e| e.is_active()))
            .map(|(uid, _)| uid.clone())
            .collect()
    }
}
