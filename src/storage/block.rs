use crate::types::{Version, VertexId};

use super::edge::Edge;
use super::options::BlockCapacity;

/// Index of a block inside an [`super::AdjacencySet`] arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BlockId(pub u32);

impl BlockId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Effect of [`EdgeBlock::insert`] on the block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    /// A new slot was created for the target.
    Created,
    /// A tombstoned entry was brought back to active.
    Revived,
    /// An already-active entry had its version refreshed.
    Refreshed,
}

/// A capacity-bounded, sorted run of edges linked to its successor.
#[derive(Clone, Debug, Default)]
pub struct EdgeBlock {
    entries: Vec<Edge>,
    next: Option<BlockId>,
}

impl EdgeBlock {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next: None,
        }
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the block holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending target order.
    pub fn entries(&self) -> &[Edge] {
        &self.entries
    }

    /// Successor in the chain.
    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<BlockId>) {
        self.next = next;
    }

    /// Largest target stored in the block.
    pub fn max_key(&self) -> Option<VertexId> {
        self.entries.last().map(|edge| edge.target)
    }

    /// Smallest target stored in the block.
    pub fn min_key(&self) -> Option<VertexId> {
        self.entries.first().map(|edge| edge.target)
    }

    fn position(&self, target: VertexId) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|edge| edge.target.cmp(&target))
    }

    /// Binary-searches for the entry targeting `target`.
    pub fn search(&self, target: VertexId) -> Option<&Edge> {
        self.position(target).ok().map(|idx| &self.entries[idx])
    }

    pub(crate) fn search_mut(&mut self, target: VertexId) -> Option<&mut Edge> {
        match self.position(target) {
            Ok(idx) => Some(&mut self.entries[idx]),
            Err(_) => None,
        }
    }

    /// Inserts or overwrites the entry for `edge.target`.
    ///
    /// The block may exceed its maximum afterwards; the owning set checks
    /// [`EdgeBlock::is_overflowing`] and splits. Reviving a tombstone keeps its deleted life when that life ends at or
    /// above `watermark`.
    pub(crate) fn insert(&mut self, edge: Edge, watermark: Version) -> InsertOutcome {
        match self.position(edge.target) {
            Ok(idx) => {
                let existing = &mut self.entries[idx];
                let outcome = if existing.tombstoned {
                    InsertOutcome::Revived
                } else {
                    InsertOutcome::Refreshed
                };
                existing.overwrite(edge.version, watermark);
                outcome
            }
            Err(idx) => {
                self.entries.insert(idx, edge);
                InsertOutcome::Created
            }
        }
    }

    pub(crate) fn is_overflowing(&self, cap: BlockCapacity) -> bool {
        self.entries.len() > cap.max
    }

    pub(crate) fn is_underfull(&self, cap: BlockCapacity) -> bool {
        self.entries.len() < cap.min
    }

    /// Moves the upper half of the entries into a new block.
    ///
    /// The new block inherits this block's successor; the caller links it
    /// back in with [`EdgeBlock::set_next`] once it has an arena slot.
    pub(crate) fn split_off_upper(&mut self) -> EdgeBlock {
        let mid = self.entries.len() / 2;
        let upper = self.entries.split_off(mid);
        EdgeBlock {
            entries: upper,
            next: self.next.take(),
        }
    }

    /// Whether this block is underfull and can take all of a successor
    /// holding `next_len` entries without overflowing.
    pub(crate) fn should_absorb(&self, next_len: usize, cap: BlockCapacity) -> bool {
        self.is_underfull(cap) && self.entries.len() + next_len <= cap.max
    }

    /// Appends every entry of `next` and adopts its successor.
    pub(crate) fn absorb(&mut self, next: &mut EdgeBlock) {
        assert_ordered_boundary(self.max_key(), next.min_key());
        self.entries.append(&mut next.entries);
        self.next = next.next.take();
    }

    /// Moves up to `count` entries from the front of `next` to the back of
    /// this block. Returns how many were moved.
    pub(crate) fn borrow_front(&mut self, next: &mut EdgeBlock, count: usize) -> usize {
        assert_ordered_boundary(self.max_key(), next.min_key());
        let count = count.min(next.entries.len());
        self.entries.extend(next.entries.drain(..count));
        count
    }

    /// Drops tombstones older than `watermark` along with retired intervals
    /// no reader can observe. Returns how many entries were dropped.
    pub(crate) fn reclaim(&mut self, watermark: Version) -> usize {
        let before = self.entries.len();
        self.entries.retain(|edge| !edge.reclaimable(watermark));
        for edge in &mut self.entries {
            edge.prune_retired(watermark);
        }
        before - self.entries.len()
    }

    /// Panics unless entries are strictly ascending by target.
    pub(crate) fn assert_sorted(&self, id: BlockId) {
        for pair in self.entries.windows(2) {
            assert!(
                pair[0].target < pair[1].target,
                "edge block {} out of order: {} then {}",
                id.0,
                pair[0].target,
                pair[1].target
            );
        }
    }
}

fn assert_ordered_boundary(left_max: Option<VertexId>, right_min: Option<VertexId>) {
    if let (Some(left), Some(right)) = (left_max, right_min) {
        assert!(
            left < right,
            "adjacent edge blocks overlap: {left} is not below {right}"
        );
    }
}
