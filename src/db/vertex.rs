use parking_lot::RwLock;

use crate::storage::{AdjacencySet, BlockCapacity};
use crate::types::VertexId;

/// A vertex and the lock that serializes access to its adjacency set.
///
/// The adjacency set lives inside the lock, so it cannot be touched without
/// holding it: readers take it shared, inserts and deletes take it exclusive.
pub struct Vertex {
    id: VertexId,
    adjacency: RwLock<AdjacencySet>,
}

impl Vertex {
    pub(crate) fn new(id: VertexId, cap: BlockCapacity) -> Self {
        Self {
            id,
            adjacency: RwLock::new(AdjacencySet::new(cap)),
        }
    }

    /// Internal id of this vertex.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// The vertex lock guarding its adjacency set.
    pub fn adjacency(&self) -> &RwLock<AdjacencySet> {
        &self.adjacency
    }
}
