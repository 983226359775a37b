//! Filtered capture iteration.
//!
//! [`CaptureReader`] wraps a [`PcapReader`] with an optional
//! [`CaptureFilter`]. Several readers may walk the same file at once, each
//! with its own filter and file handle.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{PcapError, Result};
use crate::filter::CaptureFilter;
use crate::pcap::{PcapReader, RawPacket};
use crate::protocol::{Frame, LINKTYPE_ETHERNET};

/// Lazy, filtered sequence of frames from one capture file.
///
/// A read error after the file has been opened ends the sequence; the
/// error is logged and never surfaced. The file handle is released as soon
/// as the sequence is exhausted or the reader is dropped.
pub struct CaptureReader {
    path: PathBuf,
    reader: Option<PcapReader>,
    filter: Option<CaptureFilter>,
    link_type_reported: bool,
}

impl CaptureReader {
    /// Open a capture file.
    ///
    /// Fails only when the file cannot be opened or is not a capture.
    pub fn open(path: impl AsRef<Path>, filter: Option<CaptureFilter>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = PcapReader::open(&path)?;

        Ok(Self {
            path,
            reader: Some(reader),
            filter,
            link_type_reported: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filter(&self) -> Option<&CaptureFilter> {
        self.filter.as_ref()
    }

    fn read_next(&mut self) -> Option<RawPacket> {
        let reader = self.reader.as_mut()?;
        match reader.next_packet() {
            Ok(Some(packet)) => Some(packet),
            Ok(None) => {
                self.reader = None;
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "capture read failed, treating as end of file");
                self.reader = None;
                None
            }
        }
    }

    fn accepts(&mut self, packet: &RawPacket) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };

        if packet.link_type != LINKTYPE_ETHERNET && !self.link_type_reported {
            self.link_type_reported = true;
            let error = PcapError::UnsupportedLinkType {
                link_type: packet.link_type,
            };
            warn!(path = %self.path.display(), %error, "frames will not decode");
        }

        match Frame::decode(packet.link_type, &packet.data) {
            Ok(frame) => filter.matches(&frame),
            Err(e) => {
                debug!(frame = packet.frame_number, error = %e, "frame skipped by filter");
                false
            }
        }
    }
}

impl Iterator for CaptureReader {
    type Item = RawPacket;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let packet = self.read_next()?;
            if self.accepts(&packet) {
                return Some(packet);
            }
        }
    }
}

/// Source address of the first frame matching `filter`.
///
/// Returns `None` when no matching frame carries an IPv4 header.
pub fn first_source_address(path: impl AsRef<Path>, filter: &CaptureFilter) -> Result<Option<Ipv4Addr>> {
    let reader = CaptureReader::open(path, Some(filter.clone()))?;

    Ok(reader
        .filter_map(|packet| {
            let frame = Frame::decode(packet.link_type, &packet.data).ok()?;
            frame.ipv4().map(|ip| ip.source)
        })
        .next())
}

/// Earliest and latest frame timestamps, or `None` for an empty capture.
pub fn time_bounds(path: impl AsRef<Path>) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    let reader = CaptureReader::open(path, None)?;

    Ok(reader.fold(None, |bounds, packet| {
        let ts = packet.timestamp();
        match bounds {
            None => Some((ts, ts)),
            Some((start, end)) => Some((start.min(ts), end.max(ts))),
        }
    }))
}
