//! Unrolled chain of sorted edge blocks holding one vertex's out-edges.
//!
//! Blocks live in an arena and link to their successor by [`BlockId`]. The
//! owning vertex lock serializes every call; each block additionally sits
//! behind its own lock, held one at a time during a walk. The only place two
//! block locks are held together is a merge or rebalance, which locks the
//! predecessor before the successor.

use parking_lot::RwLock;
use tracing::trace;

use crate::types::{Version, VertexId};

use super::block::{BlockId, EdgeBlock, InsertOutcome};
use super::edge::Edge;
use super::options::BlockCapacity;

/// Result of [`AdjacencySet::insert`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InsertReport {
    /// What happened to the target's entry.
    pub outcome: InsertOutcome,
    /// Whether the receiving block overflowed and split.
    pub split: bool,
}

/// Result of [`AdjacencySet::delete`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DeleteReport {
    /// Whether a live entry was tombstoned.
    pub tombstoned: bool,
    /// Whether the owning block merged with its successor afterwards.
    pub merged: bool,
}

/// Work performed by [`AdjacencySet::sweep`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SweepStats {
    /// Tombstones physically removed.
    pub reclaimed: usize,
    /// Blocks unlinked because they became empty.
    pub unlinked: usize,
    /// Blocks absorbed into their predecessor.
    pub merged: usize,
    /// Underfull blocks topped up from their successor.
    pub rebalanced: usize,
}

impl SweepStats {
    pub(crate) fn accumulate(&mut self, other: SweepStats) {
        self.reclaimed += other.reclaimed;
        self.unlinked += other.unlinked;
        self.merged += other.merged;
        self.rebalanced += other.rebalanced;
    }
}

/// Ordered chain of [`EdgeBlock`]s for one vertex.
pub struct AdjacencySet {
    slots: Vec<Option<RwLock<EdgeBlock>>>,
    free: Vec<BlockId>,
    head: Option<BlockId>,
    cap: BlockCapacity,
}

impl AdjacencySet {
    /// Creates an empty chain with the given block bounds.
    pub fn new(cap: BlockCapacity) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            cap,
        }
    }

    /// First block of the chain.
    pub fn head(&self) -> Option<BlockId> {
        self.head
    }

    /// Number of linked blocks.
    pub fn block_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn block(&self, id: BlockId) -> &RwLock<EdgeBlock> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("edge block {} is linked but not allocated", id.0))
    }

    fn install(&mut self, block: EdgeBlock) -> BlockId {
        let lock = RwLock::new(block);
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(lock);
                id
            }
            None => {
                let raw = u32::try_from(self.slots.len())
                    .unwrap_or_else(|_| panic!("edge block arena exhausted"));
                self.slots.push(Some(lock));
                BlockId(raw)
            }
        }
    }

    fn release(&mut self, id: BlockId) {
        let slot = self.slots[id.index()].take();
        assert!(slot.is_some(), "edge block {} released twice", id.0);
        self.free.push(id);
    }

    /// First block whose maximum key is at least `target`.
    fn owning_block(&self, target: VertexId) -> Option<BlockId> {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            if block.max_key().is_some_and(|max| target <= max) {
                return Some(id);
            }
            cursor = block.next();
        }
        None
    }

    /// Like [`Self::owning_block`] but falls back to the tail block.
    fn insertion_block(&self, target: VertexId) -> Option<BlockId> {
        let mut cursor = self.head;
        let mut last = None;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            if block.max_key().is_some_and(|max| target <= max) {
                return Some(id);
            }
            last = Some(id);
            cursor = block.next();
        }
        last
    }

    /// Looks up the entry for `target`, tombstoned or not.
    pub fn search(&self, target: VertexId) -> Option<Edge> {
        let id = self.owning_block(target)?;
        let block = self.block(id).read();
        block.search(target).cloned()
    }

    /// Inserts `edge`, overwriting any existing entry for its target.
    ///
    /// `watermark` decides whether a revived tombstone's deleted life must
    /// stay visible to pinned snapshots.
    pub fn insert(&mut self, edge: Edge, watermark: Version) -> InsertReport {
        let id = match self.insertion_block(edge.target) {
            Some(id) => id,
            None => {
                let id = self.install(EdgeBlock::with_capacity(self.cap.max + 1));
                self.head = Some(id);
                id
            }
        };
        let (outcome, upper) = {
            let mut block = self.block(id).write();
            let outcome = block.insert(edge, watermark);
            let upper = block
                .is_overflowing(self.cap)
                .then(|| block.split_off_upper());
            (outcome, upper)
        };
        let split = upper.is_some();
        if let Some(upper) = upper {
            let upper_len = upper.len();
            let upper_id = self.install(upper);
            let mut block = self.block(id).write();
            block.set_next(Some(upper_id));
            trace!(
                block = id.0,
                new_block = upper_id.0,
                lower = block.len(),
                upper = upper_len,
                "adjacency.block.split"
            );
        }
        #[cfg(debug_assertions)]
        self.assert_ordering();
        InsertReport { outcome, split }
    }

    /// Tombstones the entry for `target` at `version`.
    ///
    /// The slot stays in place until compaction. Missing or already
    /// tombstoned entries are left alone.
    pub fn delete(&mut self, target: VertexId, version: Version) -> DeleteReport {
        let Some(id) = self.owning_block(target) else {
            return DeleteReport::default();
        };
        let tombstoned = {
            let mut block = self.block(id).write();
            match block.search_mut(target) {
                Some(edge) => edge.tombstone(version),
                None => return DeleteReport::default(),
            }
        };
        let merged = self.check_underutilization(id);
        #[cfg(debug_assertions)]
        self.assert_ordering();
        DeleteReport { tombstoned, merged }
    }

    /// Merges block `id` with its successor when `id` is underfull and the
    /// two fit in one block. Returns whether a merge happened.
    pub fn check_underutilization(&mut self, id: BlockId) -> bool {
        let absorbed = {
            let mut block = self.block(id).write();
            let Some(next_id) = block.next() else {
                return false;
            };
            if !block.is_underfull(self.cap) {
                return false;
            }
            let mut next = self.block(next_id).write();
            if !block.should_absorb(next.len(), self.cap) {
                return false;
            }
            block.absorb(&mut next);
            trace!(block = id.0, absorbed = next_id.0, len = block.len(), "adjacency.block.merge");
            next_id
        };
        self.release(absorbed);
        true
    }

    /// Targets of entries visible at `as_of`, ascending.
    ///
    /// Pass [`crate::types::VERSION_LATEST`] for the current state.
    pub fn active_edges(&self, as_of: Version) -> Vec<VertexId> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            out.extend(
                block
                    .entries()
                    .iter()
                    .filter(|edge| edge.visible_at(as_of))
                    .map(|edge| edge.target),
            );
            cursor = block.next();
        }
        out
    }

    /// Number of entries visible at `as_of`.
    pub fn degree(&self, as_of: Version) -> usize {
        let mut degree = 0;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            degree += block
                .entries()
                .iter()
                .filter(|edge| edge.visible_at(as_of))
                .count();
            cursor = block.next();
        }
        degree
    }

    /// Counts of `(live, tombstoned)` entries.
    pub fn entry_counts(&self) -> (usize, usize) {
        let mut live = 0;
        let mut tombstoned = 0;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            for edge in block.entries() {
                if edge.tombstoned {
                    tombstoned += 1;
                } else {
                    live += 1;
                }
            }
            cursor = block.next();
        }
        (live, tombstoned)
    }

    /// Entry counts of each block in chain order.
    pub fn block_lens(&self) -> Vec<usize> {
        let mut lens = Vec::with_capacity(self.block_count());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            lens.push(block.len());
            cursor = block.next();
        }
        lens
    }

    /// Drops tombstones below `watermark`, unlinks emptied blocks and, when
    /// `merge_underfull` is set, restores the minimum block length.
    pub fn sweep(&mut self, watermark: Version, merge_underfull: bool) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut prev: Option<BlockId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let (reclaimed, empty, next) = {
                let mut block = self.block(id).write();
                let reclaimed = block.reclaim(watermark);
                (reclaimed, block.is_empty(), block.next())
            };
            stats.reclaimed += reclaimed;
            if empty {
                match prev {
                    Some(prev_id) => self.block(prev_id).write().set_next(next),
                    None => self.head = next,
                }
                self.release(id);
                stats.unlinked += 1;
            } else {
                prev = Some(id);
            }
            cursor = next;
        }
        if merge_underfull {
            self.rebalance(&mut stats);
        }
        #[cfg(debug_assertions)]
        self.assert_ordering();
        stats
    }

    fn rebalance(&mut self, stats: &mut SweepStats) {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            loop {
                let absorbed = {
                    let mut block = self.block(id).write();
                    let Some(next_id) = block.next() else {
                        break;
                    };
                    if !block.is_underfull(self.cap) {
                        break;
                    }
                    let mut next = self.block(next_id).write();
                    if block.should_absorb(next.len(), self.cap) {
                        block.absorb(&mut next);
                        next_id
                    } else {
                        let wanted = self.cap.min - block.len();
                        let moved = block.borrow_front(&mut next, wanted);
                        trace!(block = id.0, from = next_id.0, moved, "adjacency.block.rebalance");
                        stats.rebalanced += 1;
                        break;
                    }
                };
                self.release(absorbed);
                stats.merged += 1;
            }
            cursor = self.block(id).read().next();
        }
    }

    /// Panics unless the chain is sorted, non-overlapping, acyclic and no
    /// block exceeds the maximum length.
    pub fn assert_ordering(&self) {
        let mut cursor = self.head;
        let mut prev_max: Option<VertexId> = None;
        let mut visited = 0usize;
        while let Some(id) = cursor {
            visited += 1;
            assert!(
                visited <= self.block_count(),
                "edge block chain revisits block {}",
                id.0
            );
            let block = self.block(id).read();
            block.assert_sorted(id);
            assert!(
                block.len() <= self.cap.max,
                "edge block {} holds {} entries, above maximum {}",
                id.0,
                block.len(),
                self.cap.max
            );
            if let (Some(prev), Some(min)) = (prev_max, block.min_key()) {
                assert!(
                    prev < min,
                    "edge block {} starts at {min}, not above predecessor max {prev}",
                    id.0
                );
            }
            if block.max_key().is_some() {
                prev_max = block.max_key();
            }
            cursor = block.next();
        }
        assert_eq!(
            visited,
            self.block_count(),
            "allocated edge blocks are missing from the chain"
        );
    }

    /// Panics if a non-tail block is below the minimum length.
    pub fn assert_capacity(&self) {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let block = self.block(id).read();
            if block.next().is_some() {
                assert!(
                    !block.is_underfull(self.cap),
                    "non-tail edge block {} holds {} entries, below minimum {}",
                    id.0,
                    block.len(),
                    self.cap.min
                );
            }
            cursor = block.next();
        }
    }
}
