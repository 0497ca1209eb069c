//! Snapshot isolation tests.
//!
//! A pinned snapshot must keep answering reads as of its version while
//! writers and the compactor carry on, and must stop holding tombstones
//! back once it is dropped.

#![allow(missing_docs)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use adjstore::{GraphStore, StoreOptions};

fn store() -> GraphStore {
    let opts = StoreOptions::new()
        .block_capacity(2, 6)
        .expect("valid capacity");
    GraphStore::with_options(opts).expect("store")
}

#[test]
fn snapshot_ignores_later_inserts() {
    let store = store();
    store.insert_edge(1, 2);
    let snap = store.snapshot();
    store.insert_edge(1, 3);
    store.insert_edge(1, 4);

    assert_eq!(snap.neighbors(1), vec![2]);
    assert!(!snap.contains_edge(1, 3));
    assert_eq!(store.get_neighbors(1), vec![2, 3, 4]);
}

#[test]
fn snapshot_still_sees_later_deletes() {
    let store = store();
    for t in 2..10 {
        store.insert_edge(1, t);
    }
    let snap = store.snapshot();
    for t in 2..6 {
        store.delete_edge(1, t);
    }

    assert_eq!(snap.neighbors(1), (2..10).collect::<Vec<_>>());
    assert_eq!(store.get_neighbors(1), (6..10).collect::<Vec<_>>());
}

#[test]
fn snapshot_survives_delete_and_reinsert() {
    let store = store();
    store.insert_edge(1, 2);
    store.insert_edge(1, 3);
    store.insert_edge(4, 3);
    let snap = store.snapshot();
    assert_eq!(snap.neighbors(1), vec![2, 3]);
    assert_eq!(snap.intersect_neighbors(1, 4), vec![3]);

    store.delete_edge(1, 2);
    store.delete_edge(1, 3);
    assert_eq!(snap.neighbors(1), vec![2, 3]);

    store.insert_edge(1, 2);
    store.insert_edge(1, 3);
    assert_eq!(snap.neighbors(1), vec![2, 3]);
    assert!(snap.contains_edge(1, 2));
    assert_eq!(snap.intersect_neighbors(1, 4), vec![3]);

    store.compact();
    assert_eq!(snap.neighbors(1), vec![2, 3]);
}

#[test]
fn snapshot_in_the_gap_stays_empty_across_reinsert() {
    let store = store();
    store.insert_edge(1, 2);
    let before = store.snapshot();
    store.delete_edge(1, 2);
    let gap = store.snapshot();
    store.insert_edge(1, 2);
    store.delete_edge(1, 2);
    store.insert_edge(1, 2);

    assert_eq!(before.neighbors(1), vec![2]);
    assert!(gap.neighbors(1).is_empty());
    assert_eq!(store.get_neighbors(1), vec![2]);
    store.compact();
    assert_eq!(before.neighbors(1), vec![2]);
    assert!(gap.neighbors(1).is_empty());
}

#[test]
fn repeated_reads_are_stable() {
    let store = store();
    for t in 0..20 {
        store.insert_edge(0, t + 100);
        store.insert_edge(1, t + 110);
    }
    let snap = store.snapshot();
    let first = snap.intersect_neighbors(0, 1);
    for t in 0..20 {
        store.delete_edge(0, t + 100);
        store.insert_edge(1, t + 200);
        store.insert_edge(0, t + 200);
    }
    store.compact();

    assert_eq!(snap.intersect_neighbors(0, 1), first);
    assert_eq!(first, (110..120).collect::<Vec<_>>());
}

#[test]
fn compaction_keeps_tombstones_visible_to_a_snapshot() {
    let store = store();
    for t in 0..12 {
        store.insert_edge(5, t);
    }
    let snap = store.snapshot();
    for t in 0..12 {
        store.delete_edge(5, t);
    }

    let stats = store.compact();
    assert_eq!(stats.edges_reclaimed, 0);
    assert_eq!(store.stats().tombstones, 12);
    assert_eq!(snap.neighbors(5).len(), 12);

    drop(snap);
    let stats = store.compact();
    assert_eq!(stats.edges_reclaimed, 12);
    assert_eq!(store.stats().tombstones, 0);
    assert!(store.get_neighbors(5).is_empty());
}

#[test]
fn watermark_tracks_oldest_snapshot() {
    let store = store();
    store.insert_edge(1, 2);
    let older = store.snapshot();
    store.insert_edge(1, 3);
    let newer = store.snapshot();

    assert_eq!(store.watermark(), older.version() + 1);
    drop(older);
    assert_eq!(store.watermark(), newer.version() + 1);
    drop(newer);
    assert_eq!(store.watermark(), store.clock().current() + 1);
    assert_eq!(store.stats().pinned_snapshots, 0);
}

#[test]
fn snapshot_holds_under_concurrent_writers_and_compactor() {
    let store = Arc::new(store());
    for t in 0..64 {
        store.insert_edge(0, t);
    }
    let expected: Vec<i64> = (0..64).collect();
    let compactor = store
        .start_compactor(Duration::from_millis(1))
        .expect("compactor");

    let snap_version = {
        let snap = store.snapshot();
        let barrier = Arc::new(Barrier::new(3));
        let writers: Vec<_> = (0..2i64)
            .map(|w| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for t in (w..64).step_by(2) {
                        store.delete_edge(0, t);
                        store.insert_edge(0, 1000 + t);
                    }
                })
            })
            .collect();
        barrier.wait();
        for _ in 0..200 {
            assert_eq!(snap.neighbors(0), expected);
        }
        for writer in writers {
            writer.join().expect("writer thread");
        }
        assert_eq!(snap.neighbors(0), expected);
        snap.version()
    };

    compactor.shutdown();
    assert!(store.watermark() > snap_version);
    store.compact();
    // The replacement targets got their ids in thread interleaving order.
    let mut latest = store.get_neighbors(0);
    latest.sort_unstable();
    assert_eq!(latest, (1000..1064).collect::<Vec<_>>());
    assert_eq!(store.stats().tombstones, 0);
    store.verify();
}
