//! pcapreduce - Reduce field-test captures into SQLite.
//!
//! Each node of a field test records a packet capture and a telemetry log.
//! This library decodes bulk UDP traffic and RIP route updates from the
//! captures, flattens the telemetry samples, and writes everything under
//! one run id, one transaction per file.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pcapreduce::config::ReductionConfig;
//! use pcapreduce::discovery::discover;
//! use pcapreduce::progress::Progress;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(ReductionConfig::new("run1"));
//!     let files = discover(&config.data_dir, &config.run_name)?;
//!     let report = pcapreduce::reduce(config, &files, &Progress::Plain).await?;
//!     println!("run {} wrote {} rows", report.run_id, report.summary.rows_written);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod job;
pub mod node;
pub mod progress;
pub mod record;
mod reduce;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use reduce::{reduce, ReductionReport};
