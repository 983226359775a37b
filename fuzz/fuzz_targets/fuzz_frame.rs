//! Fuzz target for frame decoding on both reduction paths.
//!
//! Treats the input as an Ethernet frame and runs it through the bulk
//! decoder (headers, payload bounds, fingerprint) and the routing decoder.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapreduce_core::{BulkPacket, RawPacket, RoutingDatagram};

fuzz_target!(|data: &[u8]| {
    let len = data.len() as u32;
    let packet = RawPacket::new(1, 1_672_531_200_000_000, len, len, 1, data.to_vec());

    if let Ok(bulk) = BulkPacket::decode(&packet) {
        assert_eq!(bulk.fingerprint.len(), 32);
    }
    if let Ok(datagram) = RoutingDatagram::decode(&packet) {
        let _ = datagram.into_updates().count();
    }
});
