//! Worker pools and completion tracking.
//!
//! Each file kind has its own unbounded queue and a fixed pool of
//! long-lived workers pulling from it. Every dispatched file produces
//! exactly one [`Completion`] on a shared channel, whatever the outcome;
//! [`wait_for_completion`] counts them down to zero.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::job::{CaptureJob, JobContext, JobReport};
use crate::progress::Progress;
use crate::telemetry::TelemetryJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Capture,
    Telemetry,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Capture => f.write_str("capture"),
            FileKind::Telemetry => f.write_str("telemetry"),
        }
    }
}

/// Signal that one file's job has finished.
#[derive(Debug)]
pub struct Completion {
    pub path: PathBuf,
    pub kind: FileKind,
    pub outcome: Result<JobReport>,
}

/// Runs the job for one file.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, kind: FileKind, path: PathBuf) -> Result<JobReport>;
}

/// Dispatches files to [`CaptureJob`] and [`TelemetryJob`].
pub struct JobDispatcher {
    ctx: Arc<JobContext>,
}

impl JobDispatcher {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobRunner for JobDispatcher {
    async fn run(&self, kind: FileKind, path: PathBuf) -> Result<JobReport> {
        match kind {
            FileKind::Capture => CaptureJob::new(path, Arc::clone(&self.ctx)).run().await,
            FileKind::Telemetry => TelemetryJob::new(path, Arc::clone(&self.ctx)).run().await,
        }
    }
}

type SharedQueue = Arc<Mutex<UnboundedReceiver<PathBuf>>>;

/// Fixed-size worker pools over two file queues.
pub struct Scheduler {
    capture_queue: Option<UnboundedSender<PathBuf>>,
    telemetry_queue: Option<UnboundedSender<PathBuf>>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start both pools. Returns the scheduler and the completion channel.
    ///
    /// A pool size of zero is raised to one so queued files always drain.
    pub fn start<R: JobRunner>(
        runner: Arc<R>,
        capture_workers: usize,
        telemetry_workers: usize,
    ) -> (Self, UnboundedReceiver<Completion>) {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();

        let mut workers = Vec::with_capacity(capture_workers + telemetry_workers);
        for (kind, queue, size) in [
            (FileKind::Capture, capture_rx, capture_workers),
            (FileKind::Telemetry, telemetry_rx, telemetry_workers),
        ] {
            let queue: SharedQueue = Arc::new(Mutex::new(queue));
            for id in 0..size.max(1) {
                workers.push(tokio::spawn(worker(
                    id,
                    kind,
                    Arc::clone(&queue),
                    Arc::clone(&runner),
                    done_tx.clone(),
                )));
            }
        }
        debug!(capture_workers, telemetry_workers, "scheduler started");

        (
            Self {
                capture_queue: Some(capture_tx),
                telemetry_queue: Some(telemetry_tx),
                workers,
            },
            done_rx,
        )
    }

    /// Queue a file. Returns false once queues have been closed.
    pub fn submit(&self, kind: FileKind, path: impl Into<PathBuf>) -> bool {
        let queue = match kind {
            FileKind::Capture => &self.capture_queue,
            FileKind::Telemetry => &self.telemetry_queue,
        };
        queue.as_ref().is_some_and(|tx| tx.send(path.into()).is_ok())
    }

    /// Stop accepting files. Workers exit once their queue drains.
    pub fn close_queues(&mut self) {
        self.capture_queue = None;
        self.telemetry_queue = None;
    }

    /// Close the queues and wait for every worker to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        self.close_queues();
        for handle in self.workers.drain(..) {
            handle.await?;
        }
        Ok(())
    }
}

async fn worker<R: JobRunner>(
    id: usize,
    kind: FileKind,
    queue: SharedQueue,
    runner: Arc<R>,
    done: UnboundedSender<Completion>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(path) = next else {
            break;
        };
        debug!(worker = id, %kind, file = %path.display(), "job started");

        // Run on its own task so a panicking job still yields a completion
        let job_runner = Arc::clone(&runner);
        let job_path = path.clone();
        let outcome = match tokio::spawn(async move { job_runner.run(kind, job_path).await }).await {
            Ok(result) => result,
            Err(e) => Err(Error::Task(e)),
        };

        if let Err(e) = &outcome {
            error!(%kind, file = %path.display(), error = %e, "job failed");
        }
        if done.send(Completion { path, kind, outcome }).is_err() {
            break;
        }
    }
    debug!(worker = id, %kind, "worker exiting");
}

/// Totals over every completed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub rows_written: usize,
    pub rows_failed: usize,
}

/// Wait until `total` completions have arrived.
///
/// Returns early with the first fatal job error, or with
/// [`Error::Incomplete`] if the channel closes before the count reaches
/// zero.
pub async fn wait_for_completion(
    completions: &mut UnboundedReceiver<Completion>,
    total: usize,
    progress: &Progress,
) -> Result<RunSummary> {
    let mut remaining = total;
    let mut summary = RunSummary::default();

    while remaining > 0 {
        let Some(completion) = completions.recv().await else {
            return Err(Error::Incomplete { remaining });
        };
        remaining -= 1;
        progress.update(remaining);

        match completion.outcome {
            Ok(report) => {
                summary.succeeded += 1;
                summary.rows_written += report.rows_written;
                summary.rows_failed += report.rows_failed;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(kind = %completion.kind, file = %completion.path.display(), error = %e, "file skipped");
                summary.failed += 1;
            }
        }
    }

    progress.finish();
    Ok(summary)
}
