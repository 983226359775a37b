//! Fuzz target for capture file reading.
//!
//! Covers magic detection, PCAP and PCAPNG headers and record framing.
//! A malformed file may fail to open or end early, but never panics.

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use pcapreduce_core::{bulk_packets, CaptureReader};

fuzz_target!(|data: &[u8]| {
    let Ok(mut file) = tempfile::Builder::new().suffix(".pcap").tempfile() else {
        return;
    };
    if file.write_all(data).and_then(|_| file.flush()).is_err() {
        return;
    }

    if let Ok(reader) = CaptureReader::open(file.path(), None) {
        let _ = bulk_packets(reader).count();
    }
});
