//! UDP decoding.

use etherparse::UdpHeaderSlice;
use tracing::debug;

use crate::error::ProtocolError;

/// UDP header length.
pub const HEADER_LEN: usize = 8;

/// A decoded UDP datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpDatagram<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    /// Application payload, bounded by the length field.
    pub payload: &'a [u8],
}

impl<'a> UdpDatagram<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ProtocolError> {
        let udp = UdpHeaderSlice::from_slice(data).map_err(|_| ProtocolError::PacketTooShort {
            protocol: "UDP",
            needed: HEADER_LEN,
            have: data.len(),
        })?;

        let length = udp.length();
        let end = match usize::from(length) {
            // Zero length (e.g. jumbograms) covers the rest of the datagram
            0 => data.len(),
            len if len < HEADER_LEN => {
                return Err(ProtocolError::InvalidField {
                    protocol: "UDP",
                    field: "length",
                    reason: format!("{len} is shorter than the header"),
                })
            }
            len if len > data.len() => {
                debug!(length = len, have = data.len(), "UDP length runs past the capture");
                data.len()
            }
            len => len,
        };

        Ok(Self {
            source_port: udp.source_port(),
            destination_port: udp.destination_port(),
            length,
            payload: &data[HEADER_LEN..end],
        })
    }
}
