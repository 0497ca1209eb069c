//! In-memory adjacency storage.
//!
//! Edges for one vertex are kept in an unrolled chain of sorted, size-bounded
//! blocks. This module owns the per-vertex structure and the versioning
//! primitives; cross-vertex orchestration lives in [`crate::db`].

mod adjacency;
mod block;
mod edge;
mod metrics;
mod mvcc;
mod options;

/// Per-vertex block chain and the reports its mutations return.
pub use adjacency::{AdjacencySet, DeleteReport, InsertReport, SweepStats};

/// Block-level building blocks.
pub use block::{BlockId, EdgeBlock, InsertOutcome};

/// Versioned adjacency entry.
pub use edge::Edge;

/// Metrics and profiling.
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, StoreMetrics};

/// Logical clock and snapshot pin registry.
pub use mvcc::{SnapshotRegistry, VersionClock};

/// Store configuration options.
pub use options::{
    BlockCapacity, CompactionCfg, StoreOptions, DEFAULT_MAX_BLOCK_LEN, DEFAULT_MIN_BLOCK_LEN,
};
