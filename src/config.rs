//! Run configuration.
//!
//! Built once from the command line and shared read-only by the scheduler
//! and every job.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use pcapreduce_core::{CaptureFilter, FilterError};
use tracing::warn;

pub const DEFAULT_CAPTURE_WORKERS: usize = 25;
pub const DEFAULT_TELEMETRY_WORKERS: usize = 5;
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_DISCOVERY_ADDRESS: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 9);
pub const DEFAULT_INFRASTRUCTURE_HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 240, 10);
pub const DEFAULT_NODE_PREFIX: &str = "ultra";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionConfig {
    /// Run (test) name; also the name of the directories holding its files.
    pub run_name: String,
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub capture_workers: usize,
    pub telemetry_workers: usize,
    pub max_connections: usize,
    pub busy_timeout: Duration,
    /// Multicast group routing updates are sent to.
    pub discovery_address: Ipv4Addr,
    /// Test-infrastructure host excluded from bulk traffic.
    pub infrastructure_host: Ipv4Addr,
    pub node_prefix: String,
    /// Records buffered between each decode pipeline and the merge.
    pub channel_capacity: usize,
}

impl ReductionConfig {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            data_dir: PathBuf::from("."),
            database: PathBuf::from("reduction.sqlite"),
            capture_workers: DEFAULT_CAPTURE_WORKERS,
            telemetry_workers: DEFAULT_TELEMETRY_WORKERS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            discovery_address: DEFAULT_DISCOVERY_ADDRESS,
            infrastructure_host: DEFAULT_INFRASTRUCTURE_HOST,
            node_prefix: DEFAULT_NODE_PREFIX.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Filter for unicast UDP traffic: everything except routing updates
    /// and the infrastructure host.
    pub fn bulk_filter_expr(&self) -> String {
        format!(
            "not dst host {} and udp and not host {}",
            self.discovery_address, self.infrastructure_host
        )
    }

    /// Filter for routing updates.
    pub fn routing_filter_expr(&self) -> String {
        format!("dst host {}", self.discovery_address)
    }

    pub fn bulk_filter(&self) -> Result<CaptureFilter, FilterError> {
        CaptureFilter::parse(&self.bulk_filter_expr())
    }

    pub fn routing_filter(&self) -> Result<CaptureFilter, FilterError> {
        CaptureFilter::parse(&self.routing_filter_expr())
    }

    pub fn total_workers(&self) -> usize {
        self.capture_workers + self.telemetry_workers
    }

    /// Warn when the pool cannot give every worker its own connection.
    ///
    /// Returns false in that case; the run still proceeds, with workers
    /// queueing on the pool.
    pub fn check_capacity(&self) -> bool {
        if self.max_connections < self.total_workers() {
            warn!(
                max_connections = self.max_connections,
                workers = self.total_workers(),
                "connection pool is smaller than the worker pools; jobs will wait for connections"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReductionConfig::new("run1");
        assert_eq!(config.capture_workers, 25);
        assert_eq!(config.telemetry_workers, 5);
        assert!(config.check_capacity());
    }

    #[test]
    fn test_filter_expressions() {
        let config = ReductionConfig::new("run1");
        assert_eq!(
            config.bulk_filter_expr(),
            "not dst host 224.0.0.9 and udp and not host 192.168.240.10"
        );
        assert_eq!(config.routing_filter_expr(), "dst host 224.0.0.9");
        assert!(config.bulk_filter().is_ok());
        assert!(config.routing_filter().is_ok());
    }

    #[test]
    fn test_undersized_pool() {
        let config = ReductionConfig {
            max_connections: 4,
            ..ReductionConfig::new("run1")
        };
        assert!(!config.check_capacity());
    }
}
