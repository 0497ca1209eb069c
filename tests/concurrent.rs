use adjstore::{GraphStore, StoreOptions};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const NUM_THREADS: usize = 8;
const OPERATIONS_PER_THREAD: usize = 500;

fn small_store() -> Arc<GraphStore> {
    let opts = StoreOptions::new()
        .block_capacity(4, 16)
        .expect("valid capacity");
    Arc::new(GraphStore::with_options(opts).expect("store"))
}

/// Runs `work` on `threads` threads released together, failing the test if
/// they do not all finish within `limit`.
fn run_bounded<F>(threads: usize, limit: Duration, work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(threads));
    let (done_tx, done_rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(threads);
    for thread_id in 0..threads {
        let work = Arc::clone(&work);
        let barrier = Arc::clone(&barrier);
        let done_tx = done_tx.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            work(thread_id);
            let _ = done_tx.send(thread_id);
        }));
    }
    drop(done_tx);
    for _ in 0..threads {
        done_rx
            .recv_timeout(limit)
            .expect("worker did not finish in time (deadlock or panic)");
    }
    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

#[test]
fn concurrent_inserts_on_one_hub() {
    let store = small_store();
    let writer = Arc::clone(&store);
    run_bounded(NUM_THREADS, Duration::from_secs(60), move |thread_id| {
        for i in 0..OPERATIONS_PER_THREAD {
            let target = (thread_id * OPERATIONS_PER_THREAD + i) as i64 + 1;
            writer.insert_edge(0, target);
        }
    });

    assert_eq!(store.degree(0), NUM_THREADS * OPERATIONS_PER_THREAD);
    let mut neighbors = store.get_neighbors(0);
    neighbors.sort_unstable();
    let expected: Vec<i64> = (1..=(NUM_THREADS * OPERATIONS_PER_THREAD) as i64).collect();
    assert_eq!(neighbors, expected);
    store.verify();
}

#[test]
fn concurrent_vertex_creation_is_race_free() {
    let store = small_store();
    let writer = Arc::clone(&store);
    // Every thread creates the same sources, exercising the re-check under
    // the directory write lock.
    run_bounded(NUM_THREADS, Duration::from_secs(60), move |thread_id| {
        for source in 0..64i64 {
            writer.insert_edge(source, 1_000 + thread_id as i64);
        }
    });

    let stats = store.stats();
    assert_eq!(stats.vertices, 64);
    assert_eq!(stats.live_edges, 64 * NUM_THREADS);
    for source in 0..64i64 {
        assert_eq!(store.degree(source), NUM_THREADS);
    }
}

#[test]
fn swapped_intersections_do_not_deadlock() {
    let store = small_store();
    for target in 0..200i64 {
        store.insert_edge(1, target);
        if target % 2 == 0 {
            store.insert_edge(2, target);
        }
    }

    let worker = Arc::clone(&store);
    run_bounded(NUM_THREADS * 2, Duration::from_secs(60), move |thread_id| {
        for i in 0..OPERATIONS_PER_THREAD {
            match thread_id % 4 {
                0 => {
                    worker.intersect_neighbors(1, 2);
                }
                1 => {
                    worker.intersect_neighbors(2, 1);
                }
                2 => {
                    let target = 1_000 + (i % 50) as i64;
                    worker.insert_edge(1, target);
                    worker.delete_edge(2, target);
                }
                _ => {
                    let target = 1_000 + (i % 50) as i64;
                    worker.insert_edge(2, target);
                    worker.delete_edge(1, target);
                }
            }
        }
    });

    let ab = store.intersect_neighbors(1, 2);
    let ba = store.intersect_neighbors(2, 1);
    assert_eq!(ab, ba);
    store.verify();
}

#[test]
fn readers_and_writers_with_running_compactor() {
    let store = small_store();
    let compactor = store
        .start_compactor(Duration::from_millis(2))
        .expect("spawn compactor");

    let worker = Arc::clone(&store);
    run_bounded(NUM_THREADS, Duration::from_secs(60), move |thread_id| {
        let source = (thread_id % 3) as i64;
        for i in 0..OPERATIONS_PER_THREAD {
            let target = 100 + (i % 64) as i64;
            if thread_id < NUM_THREADS / 2 {
                if i % 3 == 0 {
                    worker.delete_edge(source, target);
                } else {
                    worker.insert_edge(source, target);
                }
            } else {
                let neighbors = worker.get_neighbors(source);
                assert!(neighbors.len() <= 64);
                worker.intersect_neighbors(source, (source + 1) % 3);
            }
        }
    });

    compactor.shutdown();
    store.compact();
    assert_eq!(store.stats().tombstones, 0);
    store.verify();
}
