use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for tracking adjacency operations performed by the store.
///
/// Hooks run on the calling thread, usually while a vertex lock is held, so
/// implementations should stay cheap.
pub trait StoreMetrics: Send + Sync {
    /// Records an insert that created or revived an edge.
    fn edge_inserted(&self);

    /// Records a delete that tombstoned a live edge.
    fn edge_deleted(&self);

    /// Records a neighbor scan of one vertex.
    fn neighbors_scanned(&self);

    /// Records a two-vertex intersection.
    fn intersection(&self);

    /// Records a block split.
    fn block_split(&self);

    /// Records a block merge, whether triggered by a delete or by compaction.
    fn block_merged(&self);

    /// Records a finished compaction pass.
    ///
    /// # Parameters
    /// * `reclaimed` - Tombstoned entries physically removed during the pass.
    fn compaction_pass(&self, reclaimed: u64);
}

/// A no-op implementation of [`StoreMetrics`] that discards all recorded metrics.
#[derive(Default)]
pub struct NoopMetrics;

impl StoreMetrics for NoopMetrics {
    fn edge_inserted(&self) {}
    fn edge_deleted(&self) {}
    fn neighbors_scanned(&self) {}
    fn intersection(&self) {}
    fn block_split(&self) {}
    fn block_merged(&self) {}
    fn compaction_pass(&self, _reclaimed: u64) {}
}

/// A thread-safe counter-based implementation of [`StoreMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of edges created or revived.
    pub edges_inserted: AtomicU64,

    /// Number of edges tombstoned.
    pub edges_deleted: AtomicU64,

    /// Number of single-vertex neighbor scans.
    pub neighbor_scans: AtomicU64,

    /// Number of neighbor intersections.
    pub intersections: AtomicU64,

    /// Number of block splits.
    pub block_splits: AtomicU64,

    /// Number of block merges.
    pub block_merges: AtomicU64,

    /// Number of compaction passes completed.
    pub compaction_passes: AtomicU64,

    /// Total tombstones reclaimed by compaction.
    pub edges_reclaimed: AtomicU64,
}

impl StoreMetrics for CounterMetrics {
    fn edge_inserted(&self) {
        self.edges_inserted.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_deleted(&self) {
        self.edges_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn neighbors_scanned(&self) {
        self.neighbor_scans.fetch_add(1, Ordering::Relaxed);
    }

    fn intersection(&self) {
        self.intersections.fetch_add(1, Ordering::Relaxed);
    }

    fn block_split(&self) {
        self.block_splits.fetch_add(1, Ordering::Relaxed);
    }

    fn block_merged(&self) {
        self.block_merges.fetch_add(1, Ordering::Relaxed);
    }

    fn compaction_pass(&self, reclaimed: u64) {
        self.compaction_passes.fetch_add(1, Ordering::Relaxed);
        self.edges_reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, a shared [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn StoreMetrics> {
    Arc::new(NoopMetrics)
}
