//! Error types for pcapreduce.
//!
//! Errors fall into three classes:
//!
//! - per-record failures (a single insert), which never leave the job
//!   that hit them and are only logged
//! - per-file failures (the capture or log cannot be opened, or its name
//!   does not carry a node id), which abort that file's job only
//! - fatal failures (the store cannot begin or commit a transaction),
//!   which end the whole run; see [`Error::is_fatal`]

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pcapreduce operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Capture reading error
    #[error("Capture error: {0}")]
    Capture(#[from] pcapreduce_core::Error),

    /// A configured address does not form a valid capture filter
    #[error("Invalid capture filter: {0}")]
    Filter(#[from] pcapreduce_core::FilterError),

    /// Run metadata could not be derived from a file name
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Telemetry log could not be read
    #[error("Telemetry error: {path}: {source}")]
    Telemetry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job or worker task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The completion channel closed while files were still outstanding
    #[error("Scheduler stopped with {remaining} file(s) outstanding")]
    Incomplete { remaining: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error must end the whole run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Store(e) => e.is_fatal(),
            Error::Task(_) | Error::Incomplete { .. } => true,
            _ => false,
        }
    }
}

/// Errors deriving node identity from a file name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The name does not start with the node prefix
    #[error("{file}: expected a name starting with '{prefix}'")]
    MissingPrefix { file: String, prefix: String },

    /// The node digits after the prefix are not a number
    #[error("{file}: '{segment}' is not a decimal node id")]
    InvalidNodeId { file: String, segment: String },

    /// The node id does not fit the 192.168.N.10 address plan
    #[error("{file}: node id {node_id} is out of range (0-255)")]
    NodeIdOutOfRange { file: String, node_id: u64 },
}

/// Errors from the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database could not be opened
    #[error("Failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Schema creation or connection setup failed
    #[error("Failed to prepare schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// Transaction could not be started
    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] rusqlite::Error),

    /// Transaction could not be committed; it has been rolled back
    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] rusqlite::Error),

    /// A single row could not be written
    #[error("Failed to insert into {table}: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The store handed out a run id of zero
    #[error("Store assigned invalid run id {id}")]
    InvalidRunId { id: i64 },

    /// The connection pool has been closed
    #[error("Connection pool closed")]
    PoolClosed,
}

impl StoreError {
    /// True for failures that leave the store in an unknown state.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::Insert { .. })
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let commit = Error::Store(StoreError::Commit(rusqlite::Error::InvalidQuery));
        assert!(commit.is_fatal());

        let insert = Error::Store(StoreError::Insert {
            table: "tbl_rip",
            source: rusqlite::Error::InvalidQuery,
        });
        assert!(!insert.is_fatal());

        let metadata = Error::Metadata(MetadataError::InvalidNodeId {
            file: "ultrax-1.pcap".into(),
            segment: "x".into(),
        });
        assert!(!metadata.is_fatal());

        let open = Error::Capture(pcapreduce_core::Error::Pcap(
            pcapreduce_core::PcapError::FileNotFound {
                path: "/missing.pcap".into(),
            },
        ));
        assert!(!open.is_fatal());

        assert!(Error::Incomplete { remaining: 2 }.is_fatal());
    }

    #[test]
    fn test_metadata_display() {
        let err = MetadataError::NodeIdOutOfRange {
            file: "ultra300-a.pcap".into(),
            node_id: 300,
        };
        assert_eq!(
            err.to_string(),
            "ultra300-a.pcap: node id 300 is out of range (0-255)"
        );
    }
}
