use crate::types::{Version, VertexId};

/// A single directed adjacency entry.
///
/// `begin` is the version at which the entry last became active and
/// `version` is the version of its most recent mutation. For a tombstoned
/// entry `version` is the delete timestamp, which is what the compactor
/// compares against the watermark.
///
/// Reviving a tombstone while a pinned snapshot may still observe the
/// deleted life keeps that life as a retired `[begin, end)` interval.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    /// Internal id of the target vertex; the sort key inside a block.
    pub target: VertexId,
    /// Version of the last insert or delete applied to this entry.
    pub version: Version,
    /// Version at which the entry last transitioned to active.
    pub begin: Version,
    /// Whether the entry is logically deleted.
    pub tombstoned: bool,
    retired: Vec<(Version, Version)>,
}

impl Edge {
    /// Creates an active entry stamped with `version`.
    pub fn new(target: VertexId, version: Version) -> Self {
        Self {
            target,
            version,
            begin: version,
            tombstoned: false,
            retired: Vec::new(),
        }
    }

    /// Returns whether a reader pinned at `as_of` observes this entry.
    #[inline]
    pub fn visible_at(&self, as_of: Version) -> bool {
        let current = self.begin <= as_of && (!self.tombstoned || self.version > as_of);
        current
            || self
                .retired
                .iter()
                .any(|&(begin, end)| begin <= as_of && as_of < end)
    }

    /// Returns whether the compactor may drop this entry.
    #[inline]
    pub fn reclaimable(&self, watermark: Version) -> bool {
        self.tombstoned && self.version < watermark
    }

    /// Earlier live intervals kept for pinned snapshots, oldest first.
    pub fn retired(&self) -> &[(Version, Version)] {
        &self.retired
    }

    /// Applies a re-insert on top of an existing entry for the same target.
    ///
    /// An active entry keeps its `begin` so repeated inserts stay idempotent
    /// for snapshot readers. A tombstoned entry is revived at `version`; its
    /// deleted life is retired unless it ended below `watermark`, in which
    /// case no pinned snapshot can observe it.
    pub(crate) fn overwrite(&mut self, version: Version, watermark: Version) {
        if self.tombstoned {
            self.prune_retired(watermark);
            if self.version >= watermark {
                self.retired.push((self.begin, self.version));
            }
            self.begin = version;
            self.tombstoned = false;
        }
        self.version = version;
    }

    /// Drops retired intervals that ended below `watermark`. Returns how
    /// many were dropped.
    pub(crate) fn prune_retired(&mut self, watermark: Version) -> usize {
        let before = self.retired.len();
        self.retired.retain(|&(_, end)| end >= watermark);
        before - self.retired.len()
    }

    /// Marks the entry deleted at `version`. Returns `false` if it already was.
    pub(crate) fn tombstone(&mut self, version: Version) -> bool {
        if self.tombstoned {
            return false;
        }
        self.tombstoned = true;
        self.version = version;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_tracks_begin_and_tombstone() {
        let mut edge = Edge::new(VertexId(3), 5);
        assert!(!edge.visible_at(4));
        assert!(edge.visible_at(5));
        assert!(edge.tombstone(9));
        assert!(edge.visible_at(8));
        assert!(!edge.visible_at(9));
        assert!(!edge.visible_at(Version::MAX));
    }

    #[test]
    fn repeated_tombstone_keeps_first_delete_version() {
        let mut edge = Edge::new(VertexId(1), 1);
        assert!(edge.tombstone(4));
        assert!(!edge.tombstone(7));
        assert_eq!(edge.version, 4);
        assert!(edge.reclaimable(5));
        assert!(!edge.reclaimable(4));
    }

    #[test]
    fn overwrite_revives_tombstone_with_fresh_begin() {
        let mut edge = Edge::new(VertexId(1), 1);
        edge.overwrite(2, Version::MAX);
        assert_eq!((edge.begin, edge.version), (1, 2));
        edge.tombstone(3);
        edge.overwrite(6, 7);
        assert!(!edge.tombstoned);
        assert_eq!((edge.begin, edge.version), (6, 6));
        assert!(edge.retired().is_empty());
        assert!(!edge.visible_at(2));
    }

    #[test]
    fn revive_under_a_pin_keeps_the_deleted_life() {
        let mut edge = Edge::new(VertexId(1), 1);
        edge.tombstone(3);
        // A reader pinned at 2 holds the watermark at 3.
        edge.overwrite(5, 3);
        assert_eq!(edge.retired(), &[(1, 3)]);
        assert!(edge.visible_at(2));
        assert!(!edge.visible_at(3));
        assert!(!edge.visible_at(4));
        assert!(edge.visible_at(5));

        edge.tombstone(7);
        edge.overwrite(9, 3);
        assert_eq!(edge.retired(), &[(1, 3), (5, 7)]);
        assert!(edge.visible_at(6));
        assert!(!edge.visible_at(8));

        assert_eq!(edge.prune_retired(4), 1);
        assert_eq!(edge.retired(), &[(5, 7)]);
        assert!(!edge.visible_at(2));
        assert_eq!(edge.prune_retired(8), 1);
        assert!(edge.retired().is_empty());
    }
}
