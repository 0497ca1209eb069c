//! Concurrent workload driver for the adjacency store.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use adjstore::storage::CounterMetrics;
use adjstore::{GraphStore, StoreConfig, StoreStats};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "adjstore-stress",
    version,
    about = "Run a concurrent insert/delete/intersect workload against an in-memory adjacency store"
)]
struct Cli {
    #[arg(
        long,
        value_name = "FILE",
        env = "ADJSTORE_CONFIG",
        help = "TOML store configuration"
    )]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 4, help = "Writer threads")]
    writers: usize,

    #[arg(long, default_value_t = 4, help = "Reader threads issuing intersections")]
    readers: usize,

    #[arg(long, default_value_t = 1_024, help = "Distinct external vertex ids")]
    vertices: i64,

    #[arg(long, default_value_t = 100_000, help = "Operations per thread")]
    ops: usize,

    #[arg(
        long,
        default_value_t = 0.2,
        help = "Fraction of writer operations that delete"
    )]
    delete_ratio: f64,

    #[arg(long, help = "Seed for the per-thread generators")]
    seed: Option<u64>,

    #[arg(long, help = "Override the compaction interval (milliseconds)")]
    compaction_ms: Option<u64>,

    #[arg(long, help = "Do not start the background compactor")]
    no_compactor: bool,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Report format"
    )]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    writers: usize,
    readers: usize,
    ops_per_thread: usize,
    elapsed_ms: u128,
    ops_per_sec: f64,
    edges_inserted: u64,
    edges_deleted: u64,
    intersections: u64,
    block_splits: u64,
    block_merges: u64,
    compaction_passes: u64,
    edges_reclaimed: u64,
    store: StoreStats,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.vertices <= 0 {
        return Err("--vertices must be positive".into());
    }
    if !(0.0..=1.0).contains(&cli.delete_ratio) {
        return Err("--delete-ratio must be within 0..=1".into());
    }
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    let compactor_enabled = config.compaction.enabled && !cli.no_compactor;
    let metrics = Arc::new(CounterMetrics::default());
    let mut options = config.into_options()?.metrics(metrics.clone());
    if let Some(ms) = cli.compaction_ms {
        options.compaction.interval = Duration::from_millis(ms);
    }
    let store = Arc::new(GraphStore::with_options(options)?);
    let compactor = if compactor_enabled {
        Some(store.start_default_compactor()?)
    } else {
        None
    };

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(seed, writers = cli.writers, readers = cli.readers, "stress.start");

    let threads = cli.writers + cli.readers;
    let barrier = Arc::new(Barrier::new(threads + 1));
    let mut handles = Vec::with_capacity(threads);
    for thread_id in 0..threads {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        let is_writer = thread_id < cli.writers;
        let (vertices, ops, delete_ratio) = (cli.vertices, cli.ops, cli.delete_ratio);
        handles.push(thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(thread_id as u64));
            barrier.wait();
            for _ in 0..ops {
                let a = rng.gen_range(0..vertices);
                let b = rng.gen_range(0..vertices);
                if !is_writer {
                    store.intersect_neighbors(a, b);
                } else if rng.gen_bool(delete_ratio) {
                    store.delete_edge(a, b);
                } else {
                    store.insert_edge(a, b);
                }
            }
        }));
    }
    barrier.wait();
    let started = Instant::now();
    for handle in handles {
        if handle.join().is_err() {
            return Err("worker thread panicked".into());
        }
    }
    let elapsed = started.elapsed();

    if let Some(compactor) = compactor {
        if let Some(last) = compactor.last_stats() {
            info!(
                passes = compactor.passes(),
                reclaimed = last.edges_reclaimed,
                "stress.compactor.last_pass"
            );
        }
        compactor.shutdown();
    }
    store.verify();

    let secs = elapsed.as_secs_f64();
    let total_ops = (threads * cli.ops) as f64;
    let report = Report {
        seed,
        writers: cli.writers,
        readers: cli.readers,
        ops_per_thread: cli.ops,
        elapsed_ms: elapsed.as_millis(),
        ops_per_sec: if secs > 0.0 { total_ops / secs } else { 0.0 },
        edges_inserted: metrics.edges_inserted.load(Ordering::Relaxed),
        edges_deleted: metrics.edges_deleted.load(Ordering::Relaxed),
        intersections: metrics.intersections.load(Ordering::Relaxed),
        block_splits: metrics.block_splits.load(Ordering::Relaxed),
        block_merges: metrics.block_merges.load(Ordering::Relaxed),
        compaction_passes: metrics.compaction_passes.load(Ordering::Relaxed),
        edges_reclaimed: metrics.edges_reclaimed.load(Ordering::Relaxed),
        store: store.stats(),
    };
    emit(cli.format, &report)
}

fn emit(format: OutputFormat, report: &Report) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)?;
            println!("{json}");
        }
        OutputFormat::Text => print_report_text(report),
    }
    Ok(())
}

fn print_report_text(report: &Report) {
    println!("Workload:");
    println!(
        "  seed={} writers={} readers={} ops_per_thread={} elapsed_ms={} ops_per_sec={:.0}",
        report.seed,
        report.writers,
        report.readers,
        report.ops_per_thread,
        report.elapsed_ms,
        report.ops_per_sec
    );
    println!("Operations:");
    println!(
        "  inserted={} deleted={} intersections={}",
        report.edges_inserted, report.edges_deleted, report.intersections
    );
    println!("Blocks:");
    println!(
        "  splits={} merges={} compaction_passes={} reclaimed={}",
        report.block_splits, report.block_merges, report.compaction_passes, report.edges_reclaimed
    );
    let store = &report.store;
    println!("Store:");
    println!(
        "  vertices={} ids={} blocks={} live_edges={} tombstones={} pinned={}",
        store.vertices,
        store.assigned_ids,
        store.blocks,
        store.live_edges,
        store.tombstones,
        store.pinned_snapshots
    );
}
