//! Capture filter expressions.
//!
//! Filters use a subset of the tcpdump/BPF syntax and are evaluated in
//! process against the decoded headers of each frame:
//!
//! - Protocol: `tcp`, `udp`, `icmp`, `arp`, `ip`
//! - Host: `host 192.168.1.1`, `src host 10.0.0.1`, `dst host 224.0.0.9`
//! - Network: `net 10.0.0.0/8`, `src net 192.168.0.0/16`
//! - Port: `port 520`, `dst udp port 6000`, `portrange 5000-5010`
//! - Protocol number: `proto 17`
//! - Boolean: `and`/`&&`, `or`/`||`, `not`/`!`, parentheses
//!
//! Only IPv4 is understood. A frame without an IPv4 header matches no
//! address, port or IP protocol primitive.

pub mod ast;
pub mod parser;

use std::net::Ipv4Addr;

pub use ast::{Cidr, Direction, FilterExpr, Primitive, Protocol};
pub use parser::parse_filter;

use crate::error::FilterError;
use crate::protocol::ethernet::ethertype;
use crate::protocol::ipv4::ip_proto;
use crate::protocol::Frame;

/// A parsed filter ready to be evaluated against frames.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFilter {
    source: String,
    expr: FilterExpr,
}

impl CaptureFilter {
    /// Parse a filter expression.
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: parse_filter(source)?,
        })
    }

    /// The expression text this filter was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the filter against a decoded frame.
    pub fn matches(&self, frame: &Frame<'_>) -> bool {
        self.expr.matches(frame)
    }
}

impl std::fmt::Display for CaptureFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl FilterExpr {
    /// Evaluate this expression against a decoded frame.
    pub fn matches(&self, frame: &Frame<'_>) -> bool {
        match self {
            FilterExpr::Primitive(p) => p.matches(frame),
            FilterExpr::Not(inner) => !inner.matches(frame),
            FilterExpr::And(left, right) => left.matches(frame) && right.matches(frame),
            FilterExpr::Or(left, right) => left.matches(frame) || right.matches(frame),
        }
    }
}

impl Primitive {
    fn matches(&self, frame: &Frame<'_>) -> bool {
        match self {
            Primitive::Protocol(Protocol::Arp) => frame.ethernet.ethertype == ethertype::ARP,
            Primitive::Protocol(Protocol::Ip) => frame.ethernet.ethertype == ethertype::IPV4,
            Primitive::Protocol(Protocol::Tcp) => ip_protocol_is(frame, ip_proto::TCP),
            Primitive::Protocol(Protocol::Udp) => ip_protocol_is(frame, ip_proto::UDP),
            Primitive::Protocol(Protocol::Icmp) => ip_protocol_is(frame, ip_proto::ICMP),
            Primitive::Proto(number) => ip_protocol_is(frame, *number),
            Primitive::Host { direction, address } => {
                addresses_match(frame, *direction, |addr| addr == *address)
            }
            Primitive::Net { direction, cidr } => {
                addresses_match(frame, *direction, |addr| cidr.contains(addr))
            }
            Primitive::Port {
                direction,
                protocol,
                port,
            } => ports_match(frame, *direction, *protocol, |p| p == *port),
            Primitive::PortRange {
                direction,
                protocol,
                start,
                end,
            } => ports_match(frame, *direction, *protocol, |p| (*start..=*end).contains(&p)),
        }
    }
}

fn ip_protocol_is(frame: &Frame<'_>, number: u8) -> bool {
    frame.ipv4().is_some_and(|ip| ip.protocol == number)
}

fn addresses_match(frame: &Frame<'_>, direction: Direction, test: impl Fn(Ipv4Addr) -> bool) -> bool {
    let Some(ip) = frame.ipv4() else {
        return false;
    };
    match direction {
        Direction::Src => test(ip.source),
        Direction::Dst => test(ip.destination),
        Direction::SrcOrDst => test(ip.source) || test(ip.destination),
    }
}

fn ports_match(
    frame: &Frame<'_>,
    direction: Direction,
    protocol: Option<Protocol>,
    test: impl Fn(u16) -> bool,
) -> bool {
    let Some((transport, src, dst)) = frame.ports() else {
        return false;
    };

    let wanted = match protocol {
        Some(Protocol::Tcp) => Some(ip_proto::TCP),
        Some(Protocol::Udp) => Some(ip_proto::UDP),
        _ => None,
    };
    if wanted.is_some_and(|p| p != transport) {
        return false;
    }

    match direction {
        Direction::Src => test(src),
        Direction::Dst => test(dst),
        Direction::SrcOrDst => test(src) || test(dst),
    }
}
