use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::Version;

/// Monotonic logical clock for edge versions.
///
/// Versions are drawn while the mutated vertex's write lock is held, so
/// they increase in lock-acquisition order within a vertex.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    /// Creates a clock that has issued nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next version.
    pub fn tick(&self) -> Version {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the most recently issued version, or zero.
    pub fn current(&self) -> Version {
        self.last.load(Ordering::Acquire)
    }
}

/// Registry of versions pinned by live snapshot readers.
///
/// Each pinned version is reference counted so overlapping snapshots at the
/// same version share an entry. The smallest pinned version bounds which
/// tombstones the compactor may reclaim.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    pinned: Mutex<BTreeMap<Version, u32>>,
}

impl SnapshotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the clock's current version and returns it.
    ///
    /// The clock is read under the registry lock so a concurrent
    /// [`SnapshotRegistry::watermark`] never overtakes a new pin.
    pub fn pin(&self, clock: &VersionClock) -> Version {
        let mut pinned = self.pinned.lock();
        let version = clock.current();
        *pinned.entry(version).or_insert(0) += 1;
        version
    }

    /// Releases one pin at `version`.
    pub fn release(&self, version: Version) {
        let mut pinned = self.pinned.lock();
        match pinned.get_mut(&version) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                pinned.remove(&version);
            }
            None => panic!("snapshot at version {version} released without a pin"),
        }
    }

    /// Oldest version still pinned by a reader.
    pub fn oldest_pinned(&self) -> Option<Version> {
        self.pinned.lock().keys().next().copied()
    }

    /// Number of live pins.
    pub fn active(&self) -> usize {
        self.pinned.lock().values().map(|&count| count as usize).sum()
    }

    /// Earliest version any live reader might still need to see deleted.
    ///
    /// A tombstone stamped below the watermark is invisible to every pinned
    /// snapshot and to every snapshot that can still be taken.
    pub fn watermark(&self, clock: &VersionClock) -> Version {
        let pinned = self.pinned.lock();
        match pinned.keys().next() {
            Some(&oldest) => oldest.saturating_add(1),
            None => clock.current().saturating_add(1),
        }
    }
}
