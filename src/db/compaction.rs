use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::error::{GraphError, Result};
use crate::storage::SweepStats;
use crate::types::Version;

use super::store::GraphStore;

/// Messages accepted by the compactor loop.
pub enum CompactionMessage {
    /// Run a pass now instead of waiting for the timer.
    Trigger,
    /// Stop the loop.
    Shutdown,
}

/// Why a compaction pass ran.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompactionTrigger {
    /// Explicit call or [`CompactorHandle::trigger`].
    Manual,
    /// The compactor interval elapsed.
    Timer,
}

/// Work done by one compaction pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompactionStats {
    /// What started the pass.
    pub trigger: CompactionTrigger,
    /// Tombstones below this version were eligible.
    pub watermark: Version,
    /// Vertices visited.
    pub vertices_scanned: usize,
    /// Tombstones physically removed.
    pub edges_reclaimed: usize,
    /// Blocks unlinked after becoming empty.
    pub blocks_unlinked: usize,
    /// Blocks absorbed into their predecessor.
    pub blocks_merged: usize,
    /// Underfull blocks topped up from their successor.
    pub blocks_rebalanced: usize,
    /// Wall time spent in the pass.
    pub elapsed: Duration,
}

impl GraphStore {
    /// Runs one compaction pass on the calling thread.
    ///
    /// Vertices are locked one at a time, so readers and writers on other
    /// vertices proceed throughout the pass.
    pub fn compact(&self) -> CompactionStats {
        self.compact_with_trigger(CompactionTrigger::Manual)
    }

    pub(crate) fn compact_with_trigger(&self, trigger: CompactionTrigger) -> CompactionStats {
        let started = Instant::now();
        let watermark = self.watermark();
        let merge_underfull = self.options().compaction.merge_underfull;
        let mut totals = SweepStats::default();
        let mut vertices_scanned = 0;
        for vertex in self.vertices() {
            let sweep = vertex.adjacency().write().sweep(watermark, merge_underfull);
            for _ in 0..sweep.merged {
                self.metrics().block_merged();
            }
            totals.accumulate(sweep);
            vertices_scanned += 1;
        }
        self.metrics().compaction_pass(totals.reclaimed as u64);
        let stats = CompactionStats {
            trigger,
            watermark,
            vertices_scanned,
            edges_reclaimed: totals.reclaimed,
            blocks_unlinked: totals.unlinked,
            blocks_merged: totals.merged,
            blocks_rebalanced: totals.rebalanced,
            elapsed: started.elapsed(),
        };
        debug!(
            trigger = ?stats.trigger,
            watermark = stats.watermark,
            vertices = stats.vertices_scanned,
            reclaimed = stats.edges_reclaimed,
            unlinked = stats.blocks_unlinked,
            merged = stats.blocks_merged,
            rebalanced = stats.blocks_rebalanced,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "compactor.pass"
        );
        stats
    }

    /// Spawns a background thread that compacts every `interval`.
    ///
    /// The thread holds only a weak reference, so dropping the last
    /// [`Arc<GraphStore>`] also ends the loop.
    pub fn start_compactor(self: &Arc<Self>, interval: Duration) -> Result<CompactorHandle> {
        if interval.is_zero() {
            return Err(GraphError::InvalidArgument(
                "compaction interval must be non-zero".into(),
            ));
        }
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(CompactorShared::default());
        let store = Arc::downgrade(self);
        let loop_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("adjstore-compactor".into())
            .spawn(move || compaction_loop(store, receiver, interval, loop_shared))?;
        Ok(CompactorHandle {
            sender,
            thread: Some(thread),
            shared,
        })
    }

    /// Spawns a compactor using the interval from [`crate::storage::StoreOptions`].
    pub fn start_default_compactor(self: &Arc<Self>) -> Result<CompactorHandle> {
        let interval = self.options().compaction.interval;
        self.start_compactor(interval)
    }
}

#[derive(Default)]
struct CompactorShared {
    passes: AtomicU64,
    last: Mutex<Option<CompactionStats>>,
}

fn compaction_loop(
    store: Weak<GraphStore>,
    receiver: Receiver<CompactionMessage>,
    interval: Duration,
    shared: Arc<CompactorShared>,
) {
    info!(interval_ms = interval.as_millis() as u64, "compactor.started");
    loop {
        let trigger = match receiver.recv_timeout(interval) {
            Ok(CompactionMessage::Trigger) => CompactionTrigger::Manual,
            Err(RecvTimeoutError::Timeout) => CompactionTrigger::Timer,
            Ok(CompactionMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        };
        let Some(store) = store.upgrade() else {
            debug!("compactor.store_dropped");
            break;
        };
        let stats = store.compact_with_trigger(trigger);
        drop(store);
        *shared.last.lock() = Some(stats);
        shared.passes.fetch_add(1, Ordering::Release);
    }
    info!(passes = shared.passes.load(Ordering::Acquire), "compactor.shutdown");
}

/// Handle to a running compactor thread. Dropping it stops the thread.
pub struct CompactorHandle {
    sender: Sender<CompactionMessage>,
    thread: Option<thread::JoinHandle<()>>,
    shared: Arc<CompactorShared>,
}

impl CompactorHandle {
    /// Requests an immediate pass.
    pub fn trigger(&self) -> Result<()> {
        self.sender
            .send(CompactionMessage::Trigger)
            .map_err(|_| GraphError::CompactorClosed)
    }

    /// Number of passes completed so far.
    pub fn passes(&self) -> u64 {
        self.shared.passes.load(Ordering::Acquire)
    }

    /// Statistics from the most recent pass.
    pub fn last_stats(&self) -> Option<CompactionStats> {
        *self.shared.last.lock()
    }

    /// Whether the loop thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops the loop and waits for the thread to exit.
    ///
    /// A panic inside the compactor means a structural invariant broke; it
    /// is re-raised here rather than swallowed.
    pub fn shutdown(mut self) {
        if let Some(Err(payload)) = self.stop() {
            std::panic::resume_unwind(payload);
        }
    }

    fn stop(&mut self) -> Option<thread::Result<()>> {
        let thread = self.thread.take()?;
        // The loop may already have exited on its own; a closed channel is fine.
        let _ = self.sender.send(CompactionMessage::Shutdown);
        Some(thread.join())
    }
}

impl Drop for CompactorHandle {
    fn drop(&mut self) {
        if let Some(Err(_)) = self.stop() {
            error!("compactor.panicked");
        }
    }
}
