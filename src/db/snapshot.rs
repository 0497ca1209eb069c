use crate::types::{ExternalId, Version};

use super::store::GraphStore;

/// A pinned read view of the store.
///
/// An entry is visible when it became active at or before the pinned
/// version and was not deleted at or before it. Repeated reads through the
/// same snapshot return the same answer, including across a delete and
/// re-insert of an edge it observed.
///
/// While the snapshot lives, the compactor keeps every tombstone and every
/// retired edge life the snapshot could still observe.
pub struct Snapshot<'a> {
    store: &'a GraphStore,
    version: Version,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(store: &'a GraphStore, version: Version) -> Self {
        Self { store, version }
    }

    /// The pinned version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Out-neighbors of `vertex` as of the pinned version.
    pub fn neighbors(&self, vertex: ExternalId) -> Vec<ExternalId> {
        self.store.neighbors_at(vertex, self.version)
    }

    /// Intersection of the out-neighbors of `a` and `b` as of the pinned version.
    pub fn intersect_neighbors(&self, a: ExternalId, b: ExternalId) -> Vec<ExternalId> {
        self.store.intersect_at(a, b, self.version)
    }

    /// Whether `source -> target` was live at the pinned version.
    pub fn contains_edge(&self, source: ExternalId, target: ExternalId) -> bool {
        self.store.contains_at(source, target, self.version)
    }
}

impl Drop for Snapshot<'_> {
    fn drop(&mut self) {
        self.store.snapshots().release(self.version);
    }
}
