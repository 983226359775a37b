//! Packet fingerprints.
//!
//! A fingerprint is the MD5 digest of a 16-byte projection of the IPv4
//! header followed by the application payload. Fields that routers rewrite
//! in flight (TTL, checksum, DSCP) are left out, so the same datagram
//! captured on different nodes hashes to the same value.
//!
//! Canonical header layout:
//!
//! | Bytes  | Content                                        |
//! |--------|------------------------------------------------|
//! | 0      | `version << 4 \| ihl`                          |
//! | 1-2    | total length, little-endian                    |
//! | 3-4    | identification, little-endian                  |
//! | 5-6    | `flags << 13 \| fragment offset`, little-endian |
//! | 7      | protocol                                       |
//! | 8-11   | source address, octets reversed                |
//! | 12-15  | destination address, octets reversed           |

use md5::{Digest, Md5};

use crate::protocol::Ipv4Packet;

/// Length of the canonical header projection.
pub const CANONICAL_HEADER_LEN: usize = 16;

/// Build the canonical 16-byte header projection of an IPv4 datagram.
pub fn canonical_header(ip: &Ipv4Packet<'_>) -> [u8; CANONICAL_HEADER_LEN] {
    let mut header = [0u8; CANONICAL_HEADER_LEN];

    header[0] = ip.version_ihl;
    header[1..3].copy_from_slice(&ip.total_length.to_le_bytes());
    header[3..5].copy_from_slice(&ip.identification.to_le_bytes());
    header[5..7].copy_from_slice(&ip.flags_fragment.to_le_bytes());
    header[7] = ip.protocol;

    let mut src = ip.source.octets();
    src.reverse();
    header[8..12].copy_from_slice(&src);

    let mut dst = ip.destination.octets();
    dst.reverse();
    header[12..16].copy_from_slice(&dst);

    header
}

/// Fingerprint of a datagram and its application payload, as lowercase hex.
pub fn fingerprint(ip: &Ipv4Packet<'_>, payload: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_header(ip));
    hasher.update(payload);
    hex::encode(hasher.finalize())
}
