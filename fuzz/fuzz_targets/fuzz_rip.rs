//! Fuzz target for the RIP datagram parser.
//!
//! Any payload of at least four bytes must decode, with one entry per
//! complete 20-byte chunk after the header.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapreduce_core::protocol::rip::{entry_count, HEADER_LEN};
use pcapreduce_core::RipDatagram;

fuzz_target!(|data: &[u8]| {
    match RipDatagram::parse(data) {
        Ok(datagram) => {
            assert!(data.len() >= HEADER_LEN);
            assert!(datagram.entries.len() <= entry_count(data.len()));
        }
        Err(_) => assert!(data.len() < HEADER_LEN),
    }
});
