//! Per-file jobs.
//!
//! A job owns one discovered file from opening to commit. Capture jobs
//! move through [`JobState`]; telemetry jobs are a single read-then-commit
//! step (see [`crate::telemetry`]).

mod capture;
mod merge;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use pcapreduce_core::CaptureFilter;

pub use capture::CaptureJob;
pub use merge::{Merged, TwoSourceMerge};

use crate::config::ReductionConfig;
use crate::error::Result;
use crate::record::RunId;
use crate::store::SqliteStore;

/// Lifecycle of a capture job.
///
/// `Opening -> Decoding -> Draining -> Committing -> Done`, with `Failed`
/// reachable from `Opening` and `Committing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Opening,
    Decoding,
    /// One decode pipeline has finished; waiting on the other.
    Draining,
    Committing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Opening => "opening",
            JobState::Decoding => "decoding",
            JobState::Draining => "draining",
            JobState::Committing => "committing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State shared by every job of a run.
pub struct JobContext {
    pub store: SqliteStore,
    pub run_id: RunId,
    pub config: Arc<ReductionConfig>,
    pub bulk_filter: CaptureFilter,
    pub routing_filter: CaptureFilter,
}

impl JobContext {
    /// Fails when the configured addresses do not form valid filters.
    pub fn new(store: SqliteStore, run_id: RunId, config: Arc<ReductionConfig>) -> Result<Self> {
        let bulk_filter = config.bulk_filter()?;
        let routing_filter = config.routing_filter()?;

        Ok(Self {
            store,
            run_id,
            config,
            bulk_filter,
            routing_filter,
        })
    }
}

/// Outcome of a job that reached `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub path: PathBuf,
    pub node_id: u8,
    /// Records produced by decoding.
    pub records: usize,
    pub rows_written: usize,
    pub rows_failed: usize,
}
