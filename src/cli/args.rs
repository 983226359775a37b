//! Command-line argument definitions.

use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    ReductionConfig, DEFAULT_CAPTURE_WORKERS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_NODE_PREFIX, DEFAULT_TELEMETRY_WORKERS,
};

/// Reduce a field-test run's captures and telemetry logs into SQLite.
#[derive(Parser, Debug)]
#[command(name = "pcapreduce")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run name; files are read from directories with this name
    #[arg(value_name = "RUN")]
    pub run_name: Option<String>,

    /// Data directory searched for run directories
    #[arg(short = 'd', long = "dir", default_value = ".")]
    pub dir: PathBuf,

    /// SQLite database to write to
    #[arg(long = "db", default_value = "reduction.sqlite")]
    pub database: PathBuf,

    /// Concurrent capture jobs
    #[arg(long = "capture-workers", default_value_t = DEFAULT_CAPTURE_WORKERS)]
    pub capture_workers: usize,

    /// Concurrent telemetry jobs
    #[arg(long = "telemetry-workers", default_value_t = DEFAULT_TELEMETRY_WORKERS)]
    pub telemetry_workers: usize,

    /// Maximum open database connections
    #[arg(long = "max-connections", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// How long a transaction waits on a locked database (milliseconds)
    #[arg(long = "busy-timeout-ms", default_value = "60000")]
    pub busy_timeout_ms: u64,

    /// Multicast address routing updates are sent to
    #[arg(long = "discovery-addr", default_value = "224.0.0.9")]
    pub discovery_addr: Ipv4Addr,

    /// Test-infrastructure host excluded from bulk traffic
    #[arg(long = "infrastructure-host", default_value = "192.168.240.10")]
    pub infrastructure_host: Ipv4Addr,

    /// File name prefix preceding the node number
    #[arg(long = "node-prefix", default_value = DEFAULT_NODE_PREFIX)]
    pub node_prefix: String,

    /// Records buffered per decode pipeline
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Show a progress bar instead of a remaining-file counter
    #[arg(long = "progress")]
    pub progress: bool,

    /// Print the database schema and exit
    #[arg(long = "schema")]
    pub show_schema: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the run configuration. `None` when no run name was given.
    pub fn to_config(&self) -> Option<ReductionConfig> {
        let run_name = self.run_name.clone()?;
        Some(ReductionConfig {
            data_dir: self.dir.clone(),
            database: self.database.clone(),
            capture_workers: self.capture_workers,
            telemetry_workers: self.telemetry_workers,
            max_connections: self.max_connections,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            discovery_address: self.discovery_addr,
            infrastructure_host: self.infrastructure_host,
            node_prefix: self.node_prefix.clone(),
            channel_capacity: self.channel_capacity,
            ..ReductionConfig::new(run_name)
        })
    }
}
