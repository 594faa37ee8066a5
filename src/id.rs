//! Stable identifiers and `(uid, version)` locators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default alphabet length for minted [`Uid`]s: 21 characters, matching
/// nanoid's own default and giving collision odds negligible for billions
/// of ids.
const UID_LEN: usize = 21;

/// Opaque stable identifier for a logical entity (node, edge, or
/// component), stable across all of that entity's versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(String);

impl Uid {
    /// Mint a fresh, CSPRNG-backed 21-character URL-safe id.
    pub fn new() -> Self {
        Uid(nanoid::nanoid!(UID_LEN))
    }

    /// Wrap an existing string as a `Uid`, e.g. when rehydrating from a
    /// persistence backend. Does not validate length or alphabet; callers
    /// loading from a backend are trusted to hand back what they stored.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Uid(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one specific version of a logical entity.
///
/// Equality is by both fields (invariant 1 in the data model: versions
/// are dense integers starting at 1, so two locators are the same
/// version of the same uid iff both fields match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locator {
    pub uid: Uid,
    pub version: u32,
}

impl Locator {
    /// Construct the first version's locator for a freshly minted uid.
    pub fn first(uid: Uid) -> Self {
        Locator { uid, version: 1 }
    }

    /// Construct a locator for a given uid/version pair.
    pub fn new(uid: Uid, version: u32) -> Self {
        debug_assert!(version >= 1, "locator version must be >= 1");
        Locator { uid, version }
    }

    /// The locator of the version that directly follows this one.
    pub fn next(&self) -> Locator {
        Locator {
            uid: self.uid.clone(),
            version: self.version + 1,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.uid, self.version)
    }
}
