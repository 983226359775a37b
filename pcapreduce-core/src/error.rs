//! Errors raised while reading and decoding captures.
//!
//! Reading a capture and decoding a frame fail in different ways: a
//! [`PcapError`] ends the file (or the attempt to open it), while a
//! [`ProtocolError`] only costs the frame it came from. Filter parsing has
//! its own [`FilterError`] since it happens once, before any file is read.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("capture: {0}")]
    Pcap(#[from] PcapError),

    #[error("decode: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Error {
    /// The capture never produced a frame: missing, unreadable or not a capture.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Error::Pcap(PcapError::FileNotFound { .. } | PcapError::InvalidFormat { .. })
        )
    }
}

#[derive(Error, Debug)]
pub enum PcapError {
    #[error("cannot open {path}")]
    FileNotFound { path: String },

    #[error("not a PCAP or PCAPNG file: {reason}")]
    InvalidFormat { reason: String },

    /// Frames on this link layer cannot be decoded as Ethernet.
    #[error("link type {link_type} is not Ethernet")]
    UnsupportedLinkType { link_type: u16 },

    /// Reading stopped partway; frames up to `frame` were delivered.
    #[error("capture cut short after frame {frame}: {reason}")]
    TruncatedPacket { frame: u64, reason: String },
}

/// Why a single frame did not decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{protocol} header needs {needed} bytes, frame has {have}")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    #[error("{protocol} {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("ethertype {ethertype:#06x} is not IPv4")]
    NotIpv4 { ethertype: u16 },

    #[error("IP protocol {protocol} is not UDP")]
    NotUdp { protocol: u8 },

    #[error("UDP datagram has no payload")]
    EmptyPayload,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("bad filter expression: {message}")]
    ParseError { message: String },

    #[error("filter expression is empty")]
    EmptyFilter,
}

impl FilterError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        FilterError::ParseError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
