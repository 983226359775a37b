//! Node identity derived from capture and telemetry file names.
//!
//! Files are named `<prefix><digits><sep>...`, e.g. `ultra7-20230101.pcap`
//! (separator `-`) or `ultra7_HMS_SNMP.json` (separator `_`). Node `N` owns
//! the unicast address `192.168.N.10`.

use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::MetadataError;

/// Identity of the node a file was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub node_id: u8,
}

impl NodeIdentity {
    pub fn new(node_id: u8) -> Self {
        Self { node_id }
    }

    /// Parse the node id from the first `separator`-delimited segment of
    /// the file name, after stripping `prefix`.
    pub fn from_file_name(path: &Path, prefix: &str, separator: char) -> Result<Self, MetadataError> {
        let file = file_name(path);
        let segment = file.split(separator).next().unwrap_or_default();

        let digits = segment
            .strip_prefix(prefix)
            .ok_or_else(|| MetadataError::MissingPrefix {
                file: file.clone(),
                prefix: prefix.to_string(),
            })?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MetadataError::InvalidNodeId {
                segment: digits.to_string(),
                file,
            });
        }

        let node_id: u64 = digits.parse().map_err(|_| MetadataError::InvalidNodeId {
            file: file.clone(),
            segment: digits.to_string(),
        })?;

        u8::try_from(node_id)
            .map(Self::new)
            .map_err(|_| MetadataError::NodeIdOutOfRange { file, node_id })
    }

    /// Capture files: `<prefix><digits>-...`.
    pub fn from_capture_path(path: &Path, prefix: &str) -> Result<Self, MetadataError> {
        Self::from_file_name(path, prefix, '-')
    }

    /// Telemetry logs: `<prefix><digits>_...`.
    pub fn from_telemetry_path(path: &Path, prefix: &str) -> Result<Self, MetadataError> {
        Self::from_file_name(path, prefix, '_')
    }

    /// The unicast address this node transmits from.
    pub fn expected_address(&self) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, self.node_id, 10)
    }

    /// True when a frame with this source address was sent by the node.
    pub fn is_outbound(&self, source: Ipv4Addr) -> bool {
        source == self.expected_address()
    }
}

/// Final path component as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
