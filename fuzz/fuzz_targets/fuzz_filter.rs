//! Fuzz target for the capture filter expression parser.
//!
//! Exercises primitives, direction qualifiers, CIDR and port range
//! parsing, and NOT > AND > OR precedence with parentheses.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapreduce_core::CaptureFilter;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        // Should never panic, only return Ok or Err
        let _ = CaptureFilter::parse(source);
    }
});
