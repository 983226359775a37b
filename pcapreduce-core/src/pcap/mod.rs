//! Capture files as a stream of raw frames.

mod packet;
mod reader;

pub use packet::RawPacket;
pub use reader::{is_gzip_extension, PcapReader};
