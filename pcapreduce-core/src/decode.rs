//! Record decoders for the bulk-traffic and routing paths.
//!
//! Both decoders consume raw frames and drop (with a debug log) anything
//! that does not decode fully. Neither ever fails as a whole.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ProtocolError;
use crate::fingerprint::fingerprint;
use crate::pcap::RawPacket;
use crate::protocol::{Frame, RipDatagram, RipEntry};

/// One unicast UDP frame from the bulk path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPacket {
    pub frame_number: u64,
    pub timestamp: DateTime<Utc>,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub destination_port: u16,
    /// IPv4 identification field.
    pub identification: u16,
    pub capture_length: u32,
    pub fingerprint: String,
}

impl BulkPacket {
    /// Decode a frame through its UDP payload and fingerprint it.
    pub fn decode(packet: &RawPacket) -> Result<Self, ProtocolError> {
        let frame = Frame::decode(packet.link_type, &packet.data)?;
        let (ip, udp) = frame.udp()?;

        if udp.payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }

        Ok(Self {
            frame_number: packet.frame_number,
            timestamp: packet.timestamp(),
            source: ip.source,
            destination: ip.destination,
            destination_port: udp.destination_port,
            identification: ip.identification,
            capture_length: packet.captured_length,
            fingerprint: fingerprint(ip, udp.payload),
        })
    }
}

/// A RIP datagram together with the time it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDatagram {
    pub frame_number: u64,
    pub observed: DateTime<Utc>,
    pub rip: RipDatagram,
}

impl RoutingDatagram {
    /// Decode the UDP payload of a routing-path frame as RIP.
    pub fn decode(packet: &RawPacket) -> Result<Self, ProtocolError> {
        let frame = Frame::decode(packet.link_type, &packet.data)?;
        let (_, udp) = frame.udp()?;
        let rip = RipDatagram::parse(udp.payload)?;
        debug!(
            frame = packet.frame_number,
            command = rip.command_name(),
            entries = rip.entries.len(),
            "routing datagram"
        );

        Ok(Self {
            frame_number: packet.frame_number,
            observed: packet.timestamp(),
            rip,
        })
    }

    /// Split into one update per route entry.
    pub fn into_updates(self) -> impl Iterator<Item = RouteUpdate> {
        let frame_number = self.frame_number;
        let observed = self.observed;
        self.rip.entries.into_iter().map(move |entry| RouteUpdate {
            frame_number,
            observed,
            entry,
        })
    }
}

/// One route entry observed on the routing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteUpdate {
    pub frame_number: u64,
    pub observed: DateTime<Utc>,
    pub entry: RipEntry,
}

/// Decode bulk-path frames, dropping any that do not reach a payload.
pub fn bulk_packets<I>(frames: I) -> impl Iterator<Item = BulkPacket>
where
    I: IntoIterator<Item = RawPacket>,
{
    frames
        .into_iter()
        .filter_map(|packet| match BulkPacket::decode(&packet) {
            Ok(bulk) => Some(bulk),
            Err(e) => {
                debug!(frame = packet.frame_number, error = %e, "dropping bulk frame");
                None
            }
        })
}

/// Decode routing-path frames into per-entry updates.
pub fn route_updates<I>(frames: I) -> impl Iterator<Item = RouteUpdate>
where
    I: IntoIterator<Item = RawPacket>,
{
    frames
        .into_iter()
        .filter_map(|packet| match RoutingDatagram::decode(&packet) {
            Ok(datagram) => Some(datagram),
            Err(e) => {
                debug!(frame = packet.frame_number, error = %e, "dropping routing frame");
                None
            }
        })
        .flat_map(RoutingDatagram::into_updates)
}
