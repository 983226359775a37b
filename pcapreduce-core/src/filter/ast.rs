//! Parsed form of a capture filter.

use std::fmt;
use std::net::Ipv4Addr;

/// Which address or port of a frame a primitive looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Src,
    Dst,
    /// No qualifier: either side may match.
    #[default]
    SrcOrDst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Arp,
    Ip,
}

impl Protocol {
    /// Only TCP and UDP may qualify a `port` or `portrange`.
    pub fn has_ports(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

/// IPv4 network as address and prefix length (0..=32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl Cidr {
    pub fn mask(&self) -> u32 {
        u32::MAX
            .checked_shl(32 - u32::from(self.prefix_len.min(32)))
            .unwrap_or(0)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (u32::from(addr) ^ u32::from(self.address)) & self.mask() == 0
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// A leaf test against one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Protocol(Protocol),
    Host {
        direction: Direction,
        address: Ipv4Addr,
    },
    Port {
        direction: Direction,
        protocol: Option<Protocol>,
        port: u16,
    },
    /// Inclusive at both ends.
    PortRange {
        direction: Direction,
        protocol: Option<Protocol>,
        start: u16,
        end: u16,
    },
    Net {
        direction: Direction,
        cidr: Cidr,
    },
    /// Raw IP protocol number.
    Proto(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Primitive(Primitive),
    Not(Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    pub fn not(inner: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(inner))
    }

    pub fn and(lhs: FilterExpr, rhs: FilterExpr) -> Self {
        FilterExpr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: FilterExpr, rhs: FilterExpr) -> Self {
        FilterExpr::Or(Box::new(lhs), Box::new(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(address: [u8; 4], prefix_len: u8) -> Cidr {
        Cidr {
            address: Ipv4Addr::from(address),
            prefix_len,
        }
    }

    #[test]
    fn test_cidr_membership() {
        let site = net([192, 168, 0, 0], 16);
        assert_eq!(site.to_string(), "192.168.0.0/16");
        assert!(site.contains(Ipv4Addr::new(192, 168, 240, 10)));
        assert!(!site.contains(Ipv4Addr::new(192, 169, 0, 1)));

        assert_eq!(net([0, 0, 0, 0], 0).mask(), 0);
        assert!(net([0, 0, 0, 0], 0).contains(Ipv4Addr::new(8, 8, 8, 8)));

        let single = net([224, 0, 0, 9], 32);
        assert!(single.contains(Ipv4Addr::new(224, 0, 0, 9)));
        assert!(!single.contains(Ipv4Addr::new(224, 0, 0, 10)));
    }

    #[test]
    fn test_unqualified_direction_matches_either() {
        assert_eq!(Direction::default(), Direction::SrcOrDst);
        assert!(Protocol::Udp.has_ports());
        assert!(!Protocol::Arp.has_ports());
    }
}
