//! Concurrent traffic simulation against one workload.
//!
//! ```text
//! worker 1 ─┐
//! worker 2 ─┼─ QueryResult ─► mpsc ─► collector (RunStats) ─► RunReport
//! worker N ─┘
//! ```
//!
//! Every worker shares the same plugin instance and database handle and
//! loops `execute_query` until the deadline, the query budget or a stop
//! request, whichever comes first.

use crate::stats::{RunReport, RunStats};
use anyhow::Context;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use workload_core::{Database, QueryResult, Workload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub workers: usize,
    pub duration: Duration,
    /// Stop after this many dispatch calls across all workers
    pub max_queries: Option<u64>,
}

/// Run until the deadline or Ctrl-C, then report.
pub async fn run_workload(
    workload: Arc<dyn Workload>,
    db: Arc<dyn Database>,
    options: RunOptions,
) -> anyhow::Result<RunReport> {
    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = stop.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers after their current query");
            signal_stop.store(true, Ordering::SeqCst);
        }
    });

    let report = run_workers(workload, db, options, stop).await;
    interrupt.abort();
    report
}

/// Drive `options.workers` tasks until a limit is hit or `stop` is set.
pub async fn run_workers(
    workload: Arc<dyn Workload>,
    db: Arc<dyn Database>,
    options: RunOptions,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<RunReport> {
    let workers = options.workers.max(1);
    info!(
        "Running '{}' with {} workers for {:?}{}",
        workload.name(),
        workers,
        options.duration,
        options
            .max_queries
            .map(|max| format!(" (at most {max} queries)"))
            .unwrap_or_default()
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<QueryResult>();
    let mut stats = RunStats::new(workload.name(), workers);
    let collector = tokio::spawn(async move {
        while let Some(result) = rx.recv().await {
            stats.record(result);
        }
        stats
    });

    let started = Instant::now();
    let deadline = started + options.duration;
    let issued = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();

    for worker in 0..workers {
        let workload = workload.clone();
        let db = db.clone();
        let tx = tx.clone();
        let stop = stop.clone();
        let issued = issued.clone();
        let max_queries = options.max_queries;

        tasks.spawn(async move {
            let mut executed = 0u64;
            while !stop.load(Ordering::SeqCst) && Instant::now() < deadline {
                if let Some(max) = max_queries {
                    if issued.fetch_add(1, Ordering::SeqCst) >= max {
                        break;
                    }
                }
                let result = workload.execute_query(db.as_ref()).await;
                executed += 1;
                if tx.send(result).is_err() {
                    break;
                }
            }
            debug!("Worker {} finished after {} queries", worker, executed);
        });
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Worker task failed: {}", e);
        }
    }
    let elapsed = started.elapsed();

    let stats = collector.await.context("Result collector failed")?;
    let report = stats.report(elapsed);
    info!(
        "Completed {} queries ({} errors) in {:?}, {:.1} queries/sec",
        report.total_queries, report.total_errors, elapsed, report.throughput_qps
    );
    Ok(report)
}
