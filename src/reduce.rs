//! Run driver: from discovered files to a committed database.

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::config::ReductionConfig;
use crate::discovery::DiscoveredFiles;
use crate::error::Result;
use crate::job::JobContext;
use crate::progress::Progress;
use crate::record::RunId;
use crate::scheduler::{wait_for_completion, FileKind, JobDispatcher, RunSummary, Scheduler};
use crate::store::SqliteStore;

/// Result of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionReport {
    pub run_id: RunId,
    pub files: usize,
    pub summary: RunSummary,
}

/// Reduce every discovered file under a new run id.
///
/// Returns the first fatal error without waiting for outstanding jobs;
/// files that failed on their own are counted in the summary.
pub async fn reduce(config: Arc<ReductionConfig>, files: &DiscoveredFiles, progress: &Progress) -> Result<ReductionReport> {
    config.check_capacity();

    let store = SqliteStore::open(&config.database, config.max_connections, config.busy_timeout)?;
    let run_id = store
        .register_run(&config.run_name, &Local::now().to_rfc3339())
        .await?;
    info!(run = %config.run_name, run_id = %run_id, db = %store.path().display(), "run registered");

    let ctx = Arc::new(JobContext::new(store.clone(), run_id, Arc::clone(&config))?);
    let runner = Arc::new(JobDispatcher::new(ctx));
    let (mut scheduler, mut completions) =
        Scheduler::start(runner, config.capture_workers, config.telemetry_workers);

    for path in &files.telemetry {
        scheduler.submit(FileKind::Telemetry, path.clone());
    }
    for path in &files.captures {
        scheduler.submit(FileKind::Capture, path.clone());
    }
    scheduler.close_queues();

    let summary = wait_for_completion(&mut completions, files.total(), progress).await?;
    scheduler.shutdown().await?;
    store.close().await;

    info!(
        run_id = %run_id,
        succeeded = summary.succeeded,
        failed = summary.failed,
        rows = summary.rows_written,
        "run complete"
    );

    Ok(ReductionReport {
        run_id,
        files: files.total(),
        summary,
    })
}
