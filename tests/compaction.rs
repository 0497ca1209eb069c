use adjstore::db::CompactionTrigger;
use adjstore::storage::CounterMetrics;
use adjstore::{GraphStore, StoreOptions};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_for<F: Fn() -> bool>(what: &str, check: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        if Instant::now() > deadline {
            panic!("{what} did not happen in time");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn background_compactor_runs_with_timer() {
    let store = Arc::new(GraphStore::new());
    store.insert_edge(1, 2);
    store.insert_edge(1, 3);
    store.delete_edge(1, 2);

    let handle = store
        .start_compactor(Duration::from_millis(20))
        .expect("spawn compactor");
    wait_for("timer pass", || {
        handle
            .last_stats()
            .is_some_and(|stats| stats.trigger == CompactionTrigger::Timer)
    });
    assert_eq!(store.stats().tombstones, 0);
    assert_eq!(store.get_neighbors(1), vec![3]);
    handle.shutdown();
}

#[test]
fn shutdown_stops_the_loop() {
    let store = Arc::new(GraphStore::new());
    let handle = store
        .start_compactor(Duration::from_millis(5))
        .expect("spawn compactor");
    wait_for("first pass", || handle.passes() > 0);
    assert!(handle.is_running());
    handle.shutdown();

    // The store is still usable and no thread keeps a strong reference.
    assert_eq!(Arc::strong_count(&store), 1);
    store.insert_edge(4, 5);
    assert_eq!(store.get_neighbors(4), vec![5]);
}

#[test]
fn dropping_the_store_ends_the_loop() {
    let store = Arc::new(GraphStore::new());
    let handle = store
        .start_compactor(Duration::from_millis(5))
        .expect("spawn compactor");
    drop(store);
    wait_for("loop exit", || !handle.is_running());
    assert!(handle.trigger().is_err());
}

#[test]
fn pass_merges_underfull_blocks() {
    let metrics = Arc::new(CounterMetrics::default());
    let opts = StoreOptions::new()
        .block_capacity(8, 16)
        .expect("valid capacity")
        .metrics(metrics.clone());
    let store = GraphStore::with_options(opts).expect("store");
    for target in 0..160 {
        store.insert_edge(-1, target);
    }
    let before = store.block_lens(-1);
    assert!(before.len() > 4);

    // Thin every block out without emptying it.
    for target in 0..160 {
        if target % 8 != 0 {
            store.delete_edge(-1, target);
        }
    }
    let stats = store.compact();
    assert_eq!(stats.edges_reclaimed, 140);
    assert!(stats.blocks_merged > 0);

    let after = store.block_lens(-1);
    assert!(after.len() < before.len());
    assert_eq!(after.iter().sum::<usize>(), 20);
    for len in &after[..after.len() - 1] {
        assert!((8..=16).contains(len), "block of {len} entries after compaction");
    }
    assert_eq!(metrics.compaction_passes.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.edges_reclaimed.load(Ordering::Relaxed), 140);
    assert!(metrics.block_merges.load(Ordering::Relaxed) > 0);
    store.verify();
}

#[test]
fn pass_without_merging_leaves_short_blocks() {
    let mut opts = StoreOptions::new()
        .block_capacity(8, 16)
        .expect("valid capacity");
    opts.compaction.merge_underfull = false;
    let store = GraphStore::with_options(opts).expect("store");
    for target in 0..160 {
        store.insert_edge(-1, target);
    }
    let before = store.block_lens(-1).len();
    for target in 0..160 {
        if target % 8 != 0 {
            store.delete_edge(-1, target);
        }
    }
    let stats = store.compact();
    assert_eq!(stats.blocks_merged, 0);
    assert_eq!(stats.blocks_rebalanced, 0);
    assert_eq!(store.block_lens(-1).len(), before);
    store.verify();
}
