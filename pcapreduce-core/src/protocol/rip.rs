//! RIP (Routing Information Protocol) datagram decoding.
//!
//! A datagram is a 4-byte header (command, version, two reserved bytes)
//! followed by as many 20-byte route entries as fit in the remaining
//! length. Trailing bytes that do not fill a whole entry are padding.
//!
//! RFC 2453: RIP Version 2

use std::net::Ipv4Addr;

use tracing::debug;

use crate::error::ProtocolError;

/// Length of the fixed datagram header.
pub const HEADER_LEN: usize = 4;

/// Length of one route entry.
pub const ENTRY_LEN: usize = 20;

/// RIP commands.
pub mod command {
    pub const REQUEST: u8 = 1;
    pub const RESPONSE: u8 = 2;
}

/// Number of whole route entries carried by a payload of `len` bytes.
pub fn entry_count(len: usize) -> usize {
    len.saturating_sub(HEADER_LEN) / ENTRY_LEN
}

/// A decoded RIP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipDatagram {
    pub command: u8,
    pub version: u8,
    pub entries: Vec<RipEntry>,
}

/// One route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RipEntry {
    /// Address family identifier.
    pub identifier: u16,
    pub tag: u16,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub metric: u32,
}

impl RipDatagram {
    /// Decode the application payload of one RIP datagram.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < HEADER_LEN {
            return Err(ProtocolError::PacketTooShort {
                protocol: "RIP",
                needed: HEADER_LEN,
                have: payload.len(),
            });
        }

        let command = payload[0];
        let version = payload[1];
        // Bytes 2-3 are reserved and not validated

        let entries = payload[HEADER_LEN..]
            .chunks_exact(ENTRY_LEN)
            .enumerate()
            .filter_map(|(index, chunk)| match RipEntry::parse(chunk) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(index, error = %e, "dropping RIP entry");
                    None
                }
            })
            .collect();

        Ok(Self {
            command,
            version,
            entries,
        })
    }

    pub fn command_name(&self) -> &'static str {
        match self.command {
            command::REQUEST => "Request",
            command::RESPONSE => "Response",
            _ => "Unknown",
        }
    }
}

impl RipEntry {
    /// Decode one 20-byte route entry (network byte order).
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < ENTRY_LEN {
            return Err(ProtocolError::PacketTooShort {
                protocol: "RIP entry",
                needed: ENTRY_LEN,
                have: data.len(),
            });
        }

        let addr = |offset: usize| {
            Ipv4Addr::new(
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            )
        };

        Ok(Self {
            identifier: u16::from_be_bytes([data[0], data[1]]),
            tag: u16::from_be_bytes([data[2], data[3]]),
            address: addr(4),
            netmask: addr(8),
            next_hop: addr(12),
            metric: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
        })
    }
}
