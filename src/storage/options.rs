use std::sync::Arc;
use std::time::Duration;

use crate::error::{GraphError, Result};

use super::metrics::{default_metrics, StoreMetrics};

/// Default lower bound on entries per non-tail block.
pub const DEFAULT_MIN_BLOCK_LEN: usize = 64;
/// Default upper bound on entries per block.
pub const DEFAULT_MAX_BLOCK_LEN: usize = 256;

/// Size bounds for edge blocks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockCapacity {
    /// Minimum entries a non-tail block holds at quiescent points.
    pub min: usize,
    /// Maximum entries a block holds before it splits.
    pub max: usize,
}

impl BlockCapacity {
    /// Creates capacity bounds after validating them.
    ///
    /// `max` must be at least twice `min` so both halves of a split block
    /// stay at or above `min`.
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(GraphError::InvalidArgument(
                "minimum block length must be at least 1".into(),
            ));
        }
        if min.saturating_mul(2) > max {
            return Err(GraphError::InvalidArgument(format!(
                "maximum block length {max} must be at least twice the minimum {min}"
            )));
        }
        Ok(Self { min, max })
    }
}

impl Default for BlockCapacity {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_BLOCK_LEN,
            max: DEFAULT_MAX_BLOCK_LEN,
        }
    }
}

/// Configuration for the background compactor.
#[derive(Clone, Debug)]
pub struct CompactionCfg {
    /// Interval between timer-driven passes.
    pub interval: Duration,
    /// Whether a pass also merges or rebalances underfull blocks. When
    /// disabled, shrunken blocks wait for the next delete that touches them.
    pub merge_underfull: bool,
}

impl Default for CompactionCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            merge_underfull: true,
        }
    }
}

/// Configuration options supplied when creating a [`crate::db::GraphStore`].
#[derive(Clone)]
pub struct StoreOptions {
    /// Edge block size bounds.
    pub capacity: BlockCapacity,
    /// Background compaction settings.
    pub compaction: CompactionCfg,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn StoreMetrics>>,
}

impl StoreOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self {
            capacity: BlockCapacity::default(),
            compaction: CompactionCfg::default(),
            metrics: None,
        }
    }

    /// Sets the block size bounds, validating them.
    pub fn block_capacity(mut self, min: usize, max: usize) -> Result<Self> {
        self.capacity = BlockCapacity::new(min, max)?;
        Ok(self)
    }

    /// Sets the background compaction configuration.
    pub fn compaction(mut self, cfg: CompactionCfg) -> Self {
        self.compaction = cfg;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Re-checks every option. Fields are public, so this runs again when
    /// the store is created.
    pub fn validate(&self) -> Result<()> {
        BlockCapacity::new(self.capacity.min, self.capacity.max)?;
        if self.compaction.interval.is_zero() {
            return Err(GraphError::InvalidArgument(
                "compaction interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn metrics_sink(&self) -> Arc<dyn StoreMetrics> {
        self.metrics.clone().unwrap_or_else(default_metrics)
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new()
    }
}
