use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{
    BlockCapacity, CompactionCfg, StoreOptions, DEFAULT_MAX_BLOCK_LEN, DEFAULT_MIN_BLOCK_LEN,
};

/// File form of [`StoreOptions`].
///
/// ```toml
/// [blocks]
/// min_len = 64
/// max_len = 256
///
/// [compaction]
/// enabled = true
/// interval_ms = 5000
/// merge_underfull = true
/// ```
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Edge block size bounds.
    pub blocks: BlockSection,
    /// Background compaction settings.
    pub compaction: CompactionSection,
}

/// `[blocks]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockSection {
    /// Minimum entries per non-tail block.
    pub min_len: usize,
    /// Maximum entries per block.
    pub max_len: usize,
}

impl Default for BlockSection {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_BLOCK_LEN,
            max_len: DEFAULT_MAX_BLOCK_LEN,
        }
    }
}

/// `[compaction]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompactionSection {
    /// Whether callers should start a background compactor.
    pub enabled: bool,
    /// Milliseconds between timer-driven passes.
    pub interval_ms: u64,
    /// Whether passes also merge or rebalance underfull blocks.
    pub merge_underfull: bool,
}

impl Default for CompactionSection {
    fn default() -> Self {
        let cfg = CompactionCfg::default();
        Self {
            enabled: true,
            interval_ms: cfg.interval.as_millis() as u64,
            merge_underfull: cfg.merge_underfull,
        }
    }
}

impl StoreConfig {
    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Converts into validated [`StoreOptions`].
    pub fn into_options(self) -> Result<StoreOptions> {
        let capacity = BlockCapacity::new(self.blocks.min_len, self.blocks.max_len)?;
        let options = StoreOptions {
            capacity,
            compaction: CompactionCfg {
                interval: Duration::from_millis(self.compaction.interval_ms),
                merge_underfull: self.compaction.merge_underfull,
            },
            metrics: None,
        };
        options.validate()?;
        Ok(options)
    }
}
