use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::storage::{
    Edge, InsertOutcome, SnapshotRegistry, StoreMetrics, StoreOptions, VersionClock,
};
use crate::types::{ExternalId, Version, VertexId, VERSION_LATEST};

use super::ids::VertexIdManager;
use super::snapshot::Snapshot;
use super::vertex::Vertex;

/// Point-in-time counters describing the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StoreStats {
    /// Vertices with an adjacency set (sources of at least one insert).
    pub vertices: usize,
    /// External ids resolved to internal ids so far.
    pub assigned_ids: usize,
    /// Edge blocks linked across all vertices.
    pub blocks: usize,
    /// Non-tombstoned entries.
    pub live_edges: usize,
    /// Tombstoned entries awaiting compaction.
    pub tombstones: usize,
    /// Live snapshot pins.
    pub pinned_snapshots: usize,
}

/// Concurrent directory of vertices and the public graph API.
///
/// Lock hierarchy, outermost first:
/// 1. the directory lock, held only to find or create a vertex handle and
///    never while a vertex lock is held;
/// 2. vertex locks, taken in ascending internal id when two are needed;
/// 3. block locks inside an [`crate::storage::AdjacencySet`].
///
/// The id manager's mutex is likewise never held across a vertex lock.
pub struct GraphStore {
    directory: RwLock<FxHashMap<VertexId, Arc<Vertex>>>,
    ids: VertexIdManager,
    clock: VersionClock,
    snapshots: SnapshotRegistry,
    options: StoreOptions,
    metrics: Arc<dyn StoreMetrics>,
}

impl GraphStore {
    /// Creates a store with default options.
    pub fn new() -> Self {
        Self::build(StoreOptions::default())
    }

    /// Creates a store after validating `options`.
    pub fn with_options(options: StoreOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: StoreOptions) -> Self {
        let metrics = options.metrics_sink();
        Self {
            directory: RwLock::new(FxHashMap::default()),
            ids: VertexIdManager::new(),
            clock: VersionClock::new(),
            snapshots: SnapshotRegistry::new(),
            options,
            metrics,
        }
    }

    /// Options the store was created with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The external/internal id mapping.
    pub fn ids(&self) -> &VertexIdManager {
        &self.ids
    }

    /// The logical clock stamping edge versions.
    pub fn clock(&self) -> &VersionClock {
        &self.clock
    }

    pub(crate) fn metrics(&self) -> &dyn StoreMetrics {
        self.metrics.as_ref()
    }

    pub(crate) fn snapshots(&self) -> &SnapshotRegistry {
        &self.snapshots
    }

    fn vertex(&self, id: VertexId) -> Option<Arc<Vertex>> {
        self.directory.read().get(&id).cloned()
    }

    /// Double-checked lazy creation: look under the shared lock, then
    /// re-check under the exclusive lock before creating, since another
    /// writer may have created the vertex between the two acquisitions.
    fn vertex_or_create(&self, id: VertexId) -> Arc<Vertex> {
        if let Some(vertex) = self.vertex(id) {
            return vertex;
        }
        let mut directory = self.directory.write();
        if let Some(vertex) = directory.get(&id) {
            return Arc::clone(vertex);
        }
        let vertex = Arc::new(Vertex::new(id, self.options.capacity));
        directory.insert(id, Arc::clone(&vertex));
        trace!(vertex = %id, "graph.vertex.created");
        vertex
    }

    /// Handles to every vertex in ascending id order. The directory lock is
    /// released before this returns.
    pub(crate) fn vertices(&self) -> Vec<Arc<Vertex>> {
        let mut vertices: Vec<Arc<Vertex>> = self.directory.read().values().cloned().collect();
        vertices.sort_unstable_by_key(|vertex| vertex.id());
        vertices
    }

    /// Adds the edge `source -> target`, reviving it if it was deleted.
    pub fn insert_edge(&self, source: ExternalId, target: ExternalId) {
        let (src, dst) = self.ids.internal_pair(source, target);
        let vertex = self.vertex_or_create(src);
        let report = {
            let mut adjacency = vertex.adjacency().write();
            let version = self.clock.tick();
            // Read after the tick: any later pin lands at or above `version`.
            let watermark = self.snapshots.watermark(&self.clock);
            adjacency.insert(Edge::new(dst, version), watermark)
        };
        if report.outcome != InsertOutcome::Refreshed {
            self.metrics.edge_inserted();
        }
        if report.split {
            self.metrics.block_split();
        }
    }

    /// Logically deletes `source -> target`. Unknown vertices or edges are
    /// a no-op.
    pub fn delete_edge(&self, source: ExternalId, target: ExternalId) {
        let (Some(src), Some(dst)) = self.ids.lookup_pair(source, target) else {
            return;
        };
        let Some(vertex) = self.vertex(src) else {
            return;
        };
        let report = {
            let mut adjacency = vertex.adjacency().write();
            let version = self.clock.tick();
            adjacency.delete(dst, version)
        };
        if report.tombstoned {
            self.metrics.edge_deleted();
        }
        if report.merged {
            self.metrics.block_merged();
        }
    }

    /// Current out-neighbors of `vertex`.
    ///
    /// Results are ordered by internal id, which is the order in which
    /// external ids were first seen. That order is stable for the life of the
    /// store but unrelated to the numeric order of the external ids.
    pub fn get_neighbors(&self, vertex: ExternalId) -> Vec<ExternalId> {
        self.neighbors_at(vertex, VERSION_LATEST)
    }

    /// Vertices that both `a` and `b` point to, in internal id order.
    pub fn intersect_neighbors(&self, a: ExternalId, b: ExternalId) -> Vec<ExternalId> {
        self.intersect_at(a, b, VERSION_LATEST)
    }

    /// Whether `source -> target` is currently live.
    pub fn contains_edge(&self, source: ExternalId, target: ExternalId) -> bool {
        self.contains_at(source, target, VERSION_LATEST)
    }

    /// Number of current out-neighbors of `vertex`.
    pub fn degree(&self, vertex: ExternalId) -> usize {
        let Some(vertex) = self.ids.lookup(vertex).and_then(|id| self.vertex(id)) else {
            return 0;
        };
        let degree = vertex.adjacency().read().degree(VERSION_LATEST);
        degree
    }

    /// Entry counts of each block in `vertex`'s chain.
    pub fn block_lens(&self, vertex: ExternalId) -> Vec<usize> {
        let Some(vertex) = self.ids.lookup(vertex).and_then(|id| self.vertex(id)) else {
            return Vec::new();
        };
        let lens = vertex.adjacency().read().block_lens();
        lens
    }

    /// Pins the latest version for consistent repeated reads.
    pub fn snapshot(&self) -> Snapshot<'_> {
        let version = self.snapshots.pin(&self.clock);
        Snapshot::new(self, version)
    }

    /// Tombstones stamped below this version can be reclaimed.
    pub fn watermark(&self) -> Version {
        self.snapshots.watermark(&self.clock)
    }

    pub(crate) fn neighbors_at(&self, vertex: ExternalId, as_of: Version) -> Vec<ExternalId> {
        let Some(vertex) = self.ids.lookup(vertex).and_then(|id| self.vertex(id)) else {
            return Vec::new();
        };
        let targets = vertex.adjacency().read().active_edges(as_of);
        self.metrics.neighbors_scanned();
        self.ids.external_ids(&targets)
    }

    pub(crate) fn contains_at(
        &self,
        source: ExternalId,
        target: ExternalId,
        as_of: Version,
    ) -> bool {
        let (Some(src), Some(dst)) = self.ids.lookup_pair(source, target) else {
            return false;
        };
        let Some(vertex) = self.vertex(src) else {
            return false;
        };
        let entry = vertex.adjacency().read().search(dst);
        entry.is_some_and(|edge| edge.visible_at(as_of))
    }

    pub(crate) fn intersect_at(
        &self,
        a: ExternalId,
        b: ExternalId,
        as_of: Version,
    ) -> Vec<ExternalId> {
        let (Some(a), Some(b)) = self.ids.lookup_pair(a, b) else {
            return Vec::new();
        };
        let (Some(va), Some(vb)) = (self.vertex(a), self.vertex(b)) else {
            return Vec::new();
        };
        let common = if a == b {
            va.adjacency().read().active_edges(as_of)
        } else {
            // Ascending internal id regardless of argument order, so calls
            // with swapped arguments cannot deadlock against each other.
            let (first, second) = if a < b { (&va, &vb) } else { (&vb, &va) };
            let first_guard = first.adjacency().read();
            let second_guard = second.adjacency().read();
            let left = first_guard.active_edges(as_of);
            let right = second_guard.active_edges(as_of);
            drop(second_guard);
            drop(first_guard);
            sorted_intersection(&left, &right)
        };
        self.metrics.intersection();
        self.ids.external_ids(&common)
    }

    /// Aggregated counters across all vertices.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            assigned_ids: self.ids.len(),
            pinned_snapshots: self.snapshots.active(),
            ..StoreStats::default()
        };
        for vertex in self.vertices() {
            let adjacency = vertex.adjacency().read();
            let (live, tombstones) = adjacency.entry_counts();
            stats.vertices += 1;
            stats.blocks += adjacency.block_count();
            stats.live_edges += live;
            stats.tombstones += tombstones;
        }
        stats
    }

    /// Checks every structural invariant, panicking on the first violation.
    ///
    /// The minimum block length is only enforced when compaction folds in
    /// underfull-block merging; otherwise a swept block may legitimately sit
    /// below it until the next delete touches it.
    pub fn verify(&self) {
        let enforce_min = self.options.compaction.merge_underfull;
        for vertex in self.vertices() {
            let adjacency = vertex.adjacency().read();
            adjacency.assert_ordering();
            if enforce_min {
                adjacency.assert_capacity();
            }
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge-style intersection of two ascending id sequences.
pub(crate) fn sorted_intersection(left: &[VertexId], right: &[VertexId]) -> Vec<VertexId> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
