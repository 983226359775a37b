//! Capture file job.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pcapreduce_core::{bulk_packets, first_source_address, route_updates, time_bounds, CaptureReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{JobContext, JobReport, JobState, Merged, TwoSourceMerge};
use crate::error::Result;
use crate::node::{file_name, NodeIdentity};
use crate::record::{CaptureBatch, CaptureRecord, NodeSummary, RunContext};
use crate::time;

/// What `Opening` learns about a capture before decoding starts.
struct Opened {
    discovery_address: Option<Ipv4Addr>,
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    bulk: CaptureReader,
    routing: CaptureReader,
}

/// Reduces one capture file into bulk and routing records.
///
/// The file is read three times: once to find the discovery address and
/// time bounds, then concurrently by the bulk and routing pipelines, each
/// under its own filter.
pub struct CaptureJob {
    path: PathBuf,
    ctx: Arc<JobContext>,
    state: JobState,
}

impl CaptureJob {
    pub fn new(path: impl Into<PathBuf>, ctx: Arc<JobContext>) -> Self {
        Self {
            path: path.into(),
            ctx,
            state: JobState::Opening,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run the job to `Done` or `Failed`.
    pub async fn run(mut self) -> Result<JobReport> {
        match self.execute().await {
            Ok(report) => {
                self.transition(JobState::Done);
                info!(
                    file = %self.path.display(),
                    records = report.records,
                    written = report.rows_written,
                    failed = report.rows_failed,
                    "capture reduced"
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(JobState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: JobState) {
        if self.state.is_terminal() {
            warn!(file = %self.path.display(), state = %self.state, to = %next, "job already finished");
            return;
        }
        debug!(file = %self.path.display(), from = %self.state, to = %next, "capture job");
        self.state = next;
    }

    async fn execute(&mut self) -> Result<JobReport> {
        let ctx = Arc::clone(&self.ctx);
        let node = NodeIdentity::from_capture_path(&self.path, &ctx.config.node_prefix)?;
        let opened = self.open().await?;

        let run = RunContext {
            run_id: ctx.run_id,
            node,
            file_name: file_name(&self.path),
            discovery_address: opened.discovery_address,
        };
        let first = opened.bounds.map(|(start, _)| time::render(start));
        let last = opened.bounds.map(|(_, end)| time::render(end));
        debug!(
            file = %run.file_name,
            node = node.node_id,
            expected = %run.expected_address(),
            discovery = ?run.discovery_address,
            first = first.as_deref().unwrap_or("-"),
            last = last.as_deref().unwrap_or("-"),
            "capture opened"
        );

        self.transition(JobState::Decoding);
        let capacity = ctx.config.channel_capacity.max(1);
        let (bulk_tx, bulk_rx) = mpsc::channel(capacity);
        let (route_tx, route_rx) = mpsc::channel(capacity);

        let bulk_reader = opened.bulk;
        let bulk_task: JoinHandle<()> = tokio::task::spawn_blocking(move || {
            for packet in bulk_packets(bulk_reader) {
                if bulk_tx.blocking_send(packet).is_err() {
                    break;
                }
            }
        });

        let routing_reader = opened.routing;
        let routing_task: JoinHandle<()> = tokio::task::spawn_blocking(move || {
            for update in route_updates(routing_reader) {
                if route_tx.blocking_send(update).is_err() {
                    break;
                }
            }
        });

        let mut merge = TwoSourceMerge::new(bulk_rx, route_rx);
        let mut records = Vec::new();
        while let Some(item) = merge.next().await {
            if self.state == JobState::Decoding && merge.open_sources() < 2 {
                self.transition(JobState::Draining);
            }
            records.push(match item {
                Merged::Left(packet) => CaptureRecord::Bulk(run.bulk_record(packet)),
                Merged::Right(update) => CaptureRecord::Routing(run.routing_record(update)),
            });
        }
        if self.state == JobState::Decoding {
            self.transition(JobState::Draining);
        }

        bulk_task.await?;
        routing_task.await?;

        self.transition(JobState::Committing);
        let batch = CaptureBatch {
            summary: NodeSummary {
                run_id: run.run_id,
                node_id: node.node_id,
                start: opened.bounds.map(|(start, _)| start),
                end: opened.bounds.map(|(_, end)| end),
                discovery_address: run.discovery_address,
            },
            records,
        };
        let record_count = batch.records.len();
        let commit = ctx.store.commit_capture(batch).await?;

        Ok(JobReport {
            path: self.path.clone(),
            node_id: node.node_id,
            records: record_count,
            rows_written: commit.rows_written,
            rows_failed: commit.rows_failed,
        })
    }

    /// Scan the capture and open both decode readers.
    async fn open(&self) -> Result<Opened> {
        let path = self.path.clone();
        let bulk_filter = self.ctx.bulk_filter.clone();
        let routing_filter = self.ctx.routing_filter.clone();

        let opened = tokio::task::spawn_blocking(move || -> pcapreduce_core::Result<Opened> {
            let discovery_address = first_source_address(&path, &routing_filter)?;
            let bounds = time_bounds(&path)?;
            Ok(Opened {
                discovery_address,
                bounds,
                bulk: CaptureReader::open(&path, Some(bulk_filter))?,
                routing: CaptureReader::open(&path, Some(routing_filter))?,
            })
        })
        .await??;

        Ok(opened)
    }
}
