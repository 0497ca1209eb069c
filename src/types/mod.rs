//! Identifier and version types shared across the store.

use std::fmt;

/// Dense internal vertex identifier.
///
/// Assigned by [`crate::db::VertexIdManager`] in order of first appearance,
/// starting at zero. Internal ids are never reused, which makes them suitable
/// as the global lock-ordering key for multi-vertex operations.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct VertexId(pub u64);

/// Caller-supplied vertex identifier. Sparse and arbitrary.
pub type ExternalId = i64;

/// Logical timestamp stamped on every edge mutation.
///
/// Issued by [`crate::storage::VersionClock`]; zero is never issued, so a
/// snapshot pinned at zero observes an empty graph.
pub type Version = u64;

/// Sentinel snapshot that observes every non-tombstoned entry.
pub const VERSION_LATEST: Version = Version::MAX;

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(value: u64) -> Self {
        VertexId(value)
    }
}

impl From<VertexId> for u64 {
    fn from(value: VertexId) -> Self {
        value.0
    }
}

impl VertexId {
    /// Returns the id as an index into dense per-vertex arrays.
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}
