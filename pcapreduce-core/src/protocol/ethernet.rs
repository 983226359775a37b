//! Ethernet II decoding.

use etherparse::Ethernet2HeaderSlice;

use crate::error::ProtocolError;

/// Link type constant for Ethernet.
pub const LINKTYPE_ETHERNET: u16 = 1;

/// Length of an Ethernet II header.
pub const HEADER_LEN: usize = 14;

/// Well-known EtherTypes.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const IPV6: u16 = 0x86DD;
}

/// A decoded Ethernet II frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    pub source: [u8; 6],
    pub destination: [u8; 6],
    pub ethertype: u16,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Decode a frame captured with the given link type.
    pub fn parse(link_type: u16, data: &'a [u8]) -> Result<Self, ProtocolError> {
        if link_type != LINKTYPE_ETHERNET {
            return Err(ProtocolError::InvalidField {
                protocol: "Ethernet",
                field: "link_type",
                reason: format!("unsupported link type {link_type}"),
            });
        }

        let eth = Ethernet2HeaderSlice::from_slice(data).map_err(|_| {
            ProtocolError::PacketTooShort {
                protocol: "Ethernet",
                needed: HEADER_LEN,
                have: data.len(),
            }
        })?;

        Ok(Self {
            source: eth.source(),
            destination: eth.destination(),
            ethertype: eth.ether_type().0,
            payload: &data[eth.slice().len()..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::EthernetBuilder;

    #[test]
    fn test_parse_ipv4_frame() {
        let frame = EthernetBuilder::new().payload(vec![1, 2, 3]).build();
        let eth = EthernetFrame::parse(LINKTYPE_ETHERNET, &frame).unwrap();

        assert_eq!(eth.ethertype, ethertype::IPV4);
        assert_eq!(eth.source, [0x02, 0x00, 0x5e, 0x10, 0x00, 0x07]);
        assert_eq!(eth.payload, &[1, 2, 3]);
    }

    #[test]
    fn test_parse_too_short() {
        let err = EthernetFrame::parse(LINKTYPE_ETHERNET, &[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PacketTooShort {
                protocol: "Ethernet",
                needed: 14,
                have: 10
            }
        );
    }

    #[test]
    fn test_non_ethernet_link_type() {
        let frame = EthernetBuilder::new().build();
        // 113 = Linux cooked capture
        let err = EthernetFrame::parse(113, &frame).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "link_type", .. }));
    }
}
