//! IPv4 decoding.

use std::net::Ipv4Addr;

use etherparse::Ipv4HeaderSlice;

use crate::error::ProtocolError;

/// IP protocol numbers used by the filters.
pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// A decoded IPv4 datagram.
///
/// The header fields are kept in their on-wire form because the packet
/// fingerprint is computed over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Packet<'a> {
    /// Version and header length byte (`version << 4 | ihl`).
    pub version_ihl: u8,
    pub total_length: u16,
    pub identification: u16,
    /// Raw flags and fragment offset field (`flags << 13 | offset`).
    pub flags_fragment: u16,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Payload bounded by the total length field.
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ProtocolError> {
        let ipv4 = Ipv4HeaderSlice::from_slice(data).map_err(|e| ProtocolError::InvalidField {
            protocol: "IPv4",
            field: "header",
            reason: e.to_string(),
        })?;

        let header = ipv4.slice();
        let header_len = header.len();

        // Link-layer padding past the total length is not part of the datagram
        let end = usize::from(ipv4.total_len()).min(data.len());
        if end < header_len {
            return Err(ProtocolError::InvalidField {
                protocol: "IPv4",
                field: "total_length",
                reason: format!("{} is shorter than the header", ipv4.total_len()),
            });
        }

        Ok(Self {
            version_ihl: header[0],
            total_length: ipv4.total_len(),
            identification: ipv4.identification(),
            flags_fragment: u16::from_be_bytes([header[6], header[7]]),
            protocol: ipv4.protocol().0,
            source: ipv4.source_addr(),
            destination: ipv4.destination_addr(),
            payload: &data[header_len..end],
        })
    }

    /// Fragment offset in 8-byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.flags_fragment & 0x1fff
    }

    pub fn more_fragments(&self) -> bool {
        self.flags_fragment & 0x2000 != 0
    }

    /// Part of a fragmented datagram: more fragments follow, or this one
    /// starts past offset 0. Either way the payload is not the whole datagram.
    pub fn is_fragment(&self) -> bool {
        self.more_fragments() || self.fragment_offset() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::Ipv4Builder;

    #[test]
    fn test_parse_header_fields() {
        let packet = Ipv4Builder::new()
            .udp()
            .identification(0x1234)
            .src_ip([192, 168, 7, 10])
            .dst_ip([192, 168, 1, 20])
            .payload(vec![0xaa; 8])
            .build();

        let ip = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(ip.version_ihl, 0x45);
        assert_eq!(ip.total_length, 28);
        assert_eq!(ip.identification, 0x1234);
        assert_eq!(ip.protocol, ip_proto::UDP);
        assert_eq!(ip.source, Ipv4Addr::new(192, 168, 7, 10));
        assert_eq!(ip.destination, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(ip.payload.len(), 8);
    }

    #[test]
    fn test_payload_excludes_padding() {
        let mut packet = Ipv4Builder::new().payload(vec![0xaa; 4]).build();
        packet.extend_from_slice(&[0u8; 6]);

        let ip = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(ip.payload, &[0xaa; 4]);
    }

    #[test]
    fn test_flags_fragment_raw() {
        let packet = Ipv4Builder::new().flags_fragment(0x4000).build();
        let ip = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(ip.flags_fragment, 0x4000);
        assert!(!ip.is_fragment());

        let packet = Ipv4Builder::new().flags_fragment(0x2010).build();
        let ip = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(ip.fragment_offset(), 0x10);
        assert!(ip.is_fragment());

        // First fragment: offset 0 but more to come
        let packet = Ipv4Builder::new().flags_fragment(0x2000).build();
        let ip = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(ip.fragment_offset(), 0);
        assert!(ip.more_fragments());
        assert!(ip.is_fragment());
    }

    #[test]
    fn test_reject_wrong_version() {
        let mut packet = Ipv4Builder::new().build();
        packet[0] = 0x65;
        assert!(Ipv4Packet::parse(&packet).is_err());
    }

    #[test]
    fn test_reject_truncated_header() {
        assert!(Ipv4Packet::parse(&[0x45, 0x00, 0x00]).is_err());
    }
}
