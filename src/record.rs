//! Records written to the store.

use std::fmt;
use std::net::Ipv4Addr;
use std::num::NonZeroI64;

use chrono::{DateTime, Utc};
use pcapreduce_core::{BulkPacket, RouteUpdate};
use rusqlite::types::{ToSql, ToSqlOutput};

use crate::node::NodeIdentity;

/// Identifier of one reduction run, as assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(NonZeroI64);

impl RunId {
    /// Returns `None` for zero, which is never a valid run id.
    pub fn new(id: i64) -> Option<Self> {
        NonZeroI64::new(id).map(Self)
    }

    pub fn get(&self) -> i64 {
        self.0.get()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for RunId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}

/// Per-file context shared read-only by both decode pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: RunId,
    pub node: NodeIdentity,
    pub file_name: String,
    /// Source of the first routing frame in the capture.
    pub discovery_address: Option<Ipv4Addr>,
}

impl RunContext {
    pub fn expected_address(&self) -> Ipv4Addr {
        self.node.expected_address()
    }

    /// Tag a decoded bulk packet with run and node identity.
    pub fn bulk_record(&self, packet: BulkPacket) -> BulkTrafficRecord {
        BulkTrafficRecord {
            run_id: self.run_id,
            node_id: self.node.node_id,
            file_name: self.file_name.clone(),
            outbound: self.node.is_outbound(packet.source),
            source: packet.source,
            destination: packet.destination,
            destination_port: packet.destination_port,
            sequence_id: packet.identification,
            capture_length: packet.capture_length,
            timestamp: packet.timestamp,
            fingerprint: packet.fingerprint,
        }
    }

    /// Tag a route entry with the run and the node's discovery address.
    pub fn routing_record(&self, update: RouteUpdate) -> RoutingUpdateRecord {
        RoutingUpdateRecord {
            run_id: self.run_id,
            source: self.discovery_address,
            address: update.entry.address,
            netmask: update.entry.netmask,
            next_hop: update.entry.next_hop,
            metric: update.entry.metric,
            observed: update.observed,
        }
    }
}

/// One unicast UDP frame seen by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTrafficRecord {
    pub run_id: RunId,
    pub node_id: u8,
    pub file_name: String,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub destination_port: u16,
    /// IPv4 identification field.
    pub sequence_id: u16,
    pub capture_length: u32,
    pub timestamp: DateTime<Utc>,
    /// Sent by this node rather than received.
    pub outbound: bool,
    pub fingerprint: String,
}

/// One route entry from a routing update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingUpdateRecord {
    pub run_id: RunId,
    /// Discovery address of the capturing node.
    pub source: Option<Ipv4Addr>,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub metric: u32,
    pub observed: DateTime<Utc>,
}

/// A record from either decode pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRecord {
    Bulk(BulkTrafficRecord),
    Routing(RoutingUpdateRecord),
}

/// Per-node summary of one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub run_id: RunId,
    pub node_id: u8,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub discovery_address: Option<Ipv4Addr>,
}

/// Everything one capture file contributes to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBatch {
    pub summary: NodeSummary,
    pub records: Vec<CaptureRecord>,
}

/// Neighbour seen on one radio channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRow {
    pub resp_time: Option<DateTime<Utc>>,
    /// Channel node label as reported by the radio.
    pub node: String,
    pub island: i64,
    pub adjacency: String,
    pub cost: i64,
    pub neighbor_node: i64,
}

/// Forwarding hop advertised through a neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRow {
    pub resp_time: Option<DateTime<Utc>>,
    pub node: String,
    pub forward_node: String,
    /// The neighbour the hop is reached through.
    pub forward_hop: i64,
    pub cost: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryRow {
    pub resp_time: Option<DateTime<Utc>>,
    pub level: String,
    pub node_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRow {
    pub resp_time: Option<DateTime<Utc>>,
    pub node_id: u8,
    pub latitude: String,
    pub longitude: String,
}

/// One row derived from a telemetry log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryRow {
    Neighbor(NeighborRow),
    Forward(ForwardRow),
    Battery(BatteryRow),
    Position(PositionRow),
}

/// Everything one telemetry log contributes to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryBatch {
    pub run_id: RunId,
    pub rows: Vec<TelemetryRow>,
}
