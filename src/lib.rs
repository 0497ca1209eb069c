//! Concurrent, versioned in-memory adjacency store.
//!
//! Every vertex owns an unrolled chain of sorted, size-bounded edge blocks.
//! Inserts overwrite in place, deletes leave tombstones stamped with a
//! logical version, and a background compactor reclaims tombstones that no
//! pinned snapshot can still observe.

pub mod db;
pub mod error;
pub mod storage;
pub mod types;

pub use db::{CompactionStats, CompactorHandle, GraphStore, Snapshot, StoreConfig, StoreStats};
pub use error::{GraphError, Result};
pub use storage::StoreOptions;
pub use types::{ExternalId, Version, VertexId};
