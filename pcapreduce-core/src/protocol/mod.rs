//! Frame decoding.
//!
//! Captures are decoded layer by layer: Ethernet II, then IPv4, then the
//! transport header. [`Frame`] keeps the outcome of every layer so the
//! filter can evaluate what decoded while the record decoders can report
//! exactly where a frame stopped decoding.

pub mod ethernet;
pub mod ipv4;
pub mod rip;
pub mod udp;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use etherparse::TcpHeaderSlice;

pub use ethernet::{EthernetFrame, LINKTYPE_ETHERNET};
pub use ipv4::Ipv4Packet;
pub use rip::{RipDatagram, RipEntry};
pub use udp::UdpDatagram;

use crate::error::ProtocolError;
use ethernet::ethertype;
use ipv4::ip_proto;

/// Transport layer of an IPv4 datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport<'a> {
    Udp(UdpDatagram<'a>),
    Tcp {
        source_port: u16,
        destination_port: u16,
    },
    /// Any other IP protocol; only the number is known.
    Other(u8),
}

/// A frame decoded as far as its headers allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub ethernet: EthernetFrame<'a>,
    pub ipv4: Result<Ipv4Packet<'a>, ProtocolError>,
    pub transport: Result<Transport<'a>, ProtocolError>,
}

impl<'a> Frame<'a> {
    /// Decode a raw frame.
    ///
    /// Fails only when the link layer itself cannot be decoded; problems in
    /// upper layers are recorded on the returned frame.
    pub fn decode(link_type: u16, data: &'a [u8]) -> Result<Self, ProtocolError> {
        let ethernet = EthernetFrame::parse(link_type, data)?;

        let ipv4 = if ethernet.ethertype == ethertype::IPV4 {
            Ipv4Packet::parse(ethernet.payload)
        } else {
            Err(ProtocolError::NotIpv4 {
                ethertype: ethernet.ethertype,
            })
        };

        let transport = match &ipv4 {
            Ok(ip) => decode_transport(ip),
            Err(e) => Err(e.clone()),
        };

        Ok(Self {
            ethernet,
            ipv4,
            transport,
        })
    }

    pub fn ipv4(&self) -> Option<&Ipv4Packet<'a>> {
        self.ipv4.as_ref().ok()
    }

    /// Source and destination ports for TCP and UDP.
    pub fn ports(&self) -> Option<(u8, u16, u16)> {
        match self.transport.as_ref().ok()? {
            Transport::Udp(udp) => Some((ip_proto::UDP, udp.source_port, udp.destination_port)),
            Transport::Tcp {
                source_port,
                destination_port,
            } => Some((ip_proto::TCP, *source_port, *destination_port)),
            Transport::Other(_) => None,
        }
    }

    /// The IPv4 and UDP layers, or the reason the frame does not carry UDP.
    pub fn udp(&self) -> Result<(&Ipv4Packet<'a>, &UdpDatagram<'a>), ProtocolError> {
        let ip = self.ipv4.as_ref().map_err(Clone::clone)?;
        match self.transport.as_ref().map_err(Clone::clone)? {
            Transport::Udp(udp) => Ok((ip, udp)),
            Transport::Tcp { .. } => Err(ProtocolError::NotUdp {
                protocol: ip_proto::TCP,
            }),
            Transport::Other(protocol) => Err(ProtocolError::NotUdp {
                protocol: *protocol,
            }),
        }
    }
}

fn decode_transport<'a>(ip: &Ipv4Packet<'a>) -> Result<Transport<'a>, ProtocolError> {
    // A fragment never holds a whole transport datagram
    if ip.is_fragment() {
        return Err(ProtocolError::InvalidField {
            protocol: "IPv4",
            field: "flags_fragment",
            reason: format!(
                "fragment (MF={}, offset {}) is not a complete datagram",
                ip.more_fragments(),
                ip.fragment_offset()
            ),
        });
    }

    match ip.protocol {
        ip_proto::UDP => UdpDatagram::parse(ip.payload).map(Transport::Udp),
        ip_proto::TCP => {
            let tcp = TcpHeaderSlice::from_slice(ip.payload).map_err(|e| {
                ProtocolError::InvalidField {
                    protocol: "TCP",
                    field: "header",
                    reason: e.to_string(),
                }
            })?;
            Ok(Transport::Tcp {
                source_port: tcp.source_port(),
                destination_port: tcp.destination_port(),
            })
        }
        other => Ok(Transport::Other(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{udp_frame, EthernetBuilder, Ipv4Builder};

    #[test]
    fn test_decode_udp_frame() {
        let data = udp_frame([192, 168, 7, 10], 5000, [192, 168, 1, 20], 6000, 0x1234, b"AB");
        let frame = Frame::decode(LINKTYPE_ETHERNET, &data).unwrap();

        let (ip, udp) = frame.udp().unwrap();
        assert_eq!(ip.identification, 0x1234);
        assert_eq!(udp.destination_port, 6000);
        assert_eq!(udp.payload, b"AB");
        assert_eq!(frame.ports(), Some((17, 5000, 6000)));
    }

    #[test]
    fn test_decode_arp_frame() {
        let data = EthernetBuilder::new().arp().payload(vec![0; 28]).build();
        let frame = Frame::decode(LINKTYPE_ETHERNET, &data).unwrap();

        assert!(frame.ipv4().is_none());
        assert_eq!(
            frame.udp().unwrap_err(),
            ProtocolError::NotIpv4 { ethertype: 0x0806 }
        );
    }

    #[test]
    fn test_decode_icmp_frame() {
        let ip = Ipv4Builder::new().icmp().payload(vec![8, 0, 0, 0]).build();
        let data = EthernetBuilder::new().payload(ip).build();
        let frame = Frame::decode(LINKTYPE_ETHERNET, &data).unwrap();

        assert_eq!(frame.transport, Ok(Transport::Other(1)));
        assert_eq!(frame.ports(), None);
        assert_eq!(frame.udp().unwrap_err(), ProtocolError::NotUdp { protocol: 1 });
    }

    #[test]
    fn test_decode_later_fragment() {
        let ip = Ipv4Builder::new()
            .udp()
            .flags_fragment(0x0004)
            .payload(vec![0; 16])
            .build();
        let data = EthernetBuilder::new().payload(ip).build();
        let frame = Frame::decode(LINKTYPE_ETHERNET, &data).unwrap();

        assert!(frame.ipv4().is_some());
        assert!(frame.transport.is_err());
    }

    #[test]
    fn test_decode_truncated_ethernet() {
        assert!(Frame::decode(LINKTYPE_ETHERNET, &[0; 6]).is_err());
    }
}
