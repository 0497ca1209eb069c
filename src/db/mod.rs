//! Vertex directory, public graph API and background compaction.

mod compaction;
mod config;
mod ids;
mod snapshot;
mod store;
mod vertex;


pub use compaction::{CompactionMessage, CompactionStats, CompactionTrigger, CompactorHandle};
pub use config::{BlockSection, CompactionSection, StoreConfig};
pub use ids::VertexIdManager;
pub use snapshot::Snapshot;
pub use store::{GraphStore, StoreStats};
pub use vertex::Vertex;
