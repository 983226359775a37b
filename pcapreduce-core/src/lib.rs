//! # pcapreduce-core
//!
//! Capture decoding for pcapreduce, without any database or async
//! dependencies.
//!
//! ## Features
//!
//! - **Capture Reading**: PCAP (micro- and nanosecond) and PCAPNG, plain or
//!   gzip-compressed
//! - **Filters**: tcpdump-style expressions evaluated against decoded headers
//! - **Decoding**: Ethernet II, IPv4, UDP and RIP
//! - **Fingerprints**: MD5 over a canonical IPv4 header projection plus the
//!   application payload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pcapreduce_core::{bulk_packets, CaptureFilter, CaptureReader};
//!
//! let filter = CaptureFilter::parse("not dst host 224.0.0.9 and udp").unwrap();
//! let reader = CaptureReader::open("ultra7-20230101.pcap", Some(filter)).unwrap();
//!
//! for packet in bulk_packets(reader) {
//!     println!("{} -> {} {}", packet.source, packet.destination, packet.fingerprint);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pcapreduce-core                              |
//! +---------------------------------------------------------------------+
//! |  pcap/        - PCAP/PCAPNG reading, gzip                           |
//! |  capture      - filtered frame iteration, capture scans             |
//! |  filter/      - filter expression AST, parser, evaluation           |
//! |  protocol/    - Ethernet, IPv4, UDP, RIP decoders                   |
//! |  fingerprint  - canonical header and digest                         |
//! |  decode       - bulk and routing record decoders                    |
//! |  error        - Error types                                         |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Crate Features
//!
//! - `test-utils` - Frame and capture-file builders for downstream tests

pub mod capture;
pub mod decode;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod pcap;
pub mod protocol;

pub use capture::{first_source_address, time_bounds, CaptureReader};
pub use decode::{bulk_packets, route_updates, BulkPacket, RouteUpdate, RoutingDatagram};
pub use error::{Error, FilterError, PcapError, ProtocolError, Result};
pub use filter::CaptureFilter;
pub use fingerprint::{canonical_header, fingerprint};
pub use pcap::{PcapReader, RawPacket};
pub use protocol::{Frame, RipDatagram, RipEntry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
