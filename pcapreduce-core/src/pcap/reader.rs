//! Capture file reader.
//!
//! Both container formats are driven through one pull loop; the format only
//! decides how a block becomes a frame.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapNGReader};

use super::RawPacket;
use crate::error::{Error, PcapError as CaptureError};

/// Parser buffer; must hold the largest block in the file.
const BUFFER_SIZE: usize = 65536;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Link type assumed until a header says otherwise.
const DEFAULT_LINK_TYPE: u16 = 1;

type Source = BufReader<Box<dyn Read + Send>>;

/// Container format, from the first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pcap { nanos: bool },
    PcapNg,
}

impl Format {
    fn detect(magic: [u8; 4]) -> Option<Self> {
        match magic {
            [0xd4, 0xc3, 0xb2, 0xa1] | [0xa1, 0xb2, 0xc3, 0xd4] => Some(Format::Pcap { nanos: false }),
            [0x4d, 0x3c, 0xb2, 0xa1] | [0xa1, 0xb2, 0x3c, 0x4d] => Some(Format::Pcap { nanos: true }),
            [0x0a, 0x0d, 0x0d, 0x0a] => Some(Format::PcapNg),
            _ => None,
        }
    }
}

enum Blocks {
    Pcap(LegacyPcapReader<Source>),
    PcapNg(PcapNGReader<Source>),
}

/// Frame-by-frame reader over a PCAP or PCAPNG file, plain or gzipped.
pub struct PcapReader {
    blocks: Blocks,
    format: Format,
    frame_number: u64,
    link_type: u16,
}

impl PcapReader {
    /// Open a capture file, detecting gzip and the container format.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let gzipped = is_gzip_extension(path) || starts_with_gzip_magic(path)?;

        let mut magic = [0u8; 4];
        open_source(path, gzipped)?.read_exact(&mut magic).map_err(|_| invalid("file too short for a capture header"))?;
        let format = Format::detect(magic).ok_or_else(|| invalid(format!("unrecognised magic {magic:02x?}")))?;

        let source = BufReader::with_capacity(BUFFER_SIZE, open_source(path, gzipped)?);
        let blocks = match format {
            Format::Pcap { .. } => LegacyPcapReader::new(BUFFER_SIZE, source)
                .map(Blocks::Pcap)
                .map_err(|e| invalid(format!("bad PCAP header: {e}")))?,
            Format::PcapNg => PcapNGReader::new(BUFFER_SIZE, source)
                .map(Blocks::PcapNg)
                .map_err(|e| invalid(format!("bad PCAPNG section header: {e}")))?,
        };

        Ok(Self {
            blocks,
            format,
            frame_number: 0,
            link_type: DEFAULT_LINK_TYPE,
        })
    }

    /// Link type from the most recent file or interface header.
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// Frames read so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Read the next frame; `Ok(None)` at end of file.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, Error> {
        let Self {
            blocks,
            format,
            frame_number,
            link_type,
        } = self;
        let nanos = matches!(format, Format::Pcap { nanos: true });
        let frame = *frame_number;

        let mut to_frame = |block: PcapBlockOwned<'_>| -> Option<RawPacket> {
            // (timestamp_us, captured, original, data)
            let (ts, caplen, origlen, data) = match block {
                PcapBlockOwned::LegacyHeader(header) => {
                    *link_type = header.network.0 as u16;
                    return None;
                }
                PcapBlockOwned::Legacy(record) => {
                    let fraction = i64::from(record.ts_usec);
                    let micros = if nanos { fraction / 1_000 } else { fraction };
                    (
                        i64::from(record.ts_sec) * 1_000_000 + micros,
                        record.caplen,
                        record.origlen,
                        record.data,
                    )
                }
                PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                    *link_type = idb.linktype.0 as u16;
                    return None;
                }
                // Interface resolution is taken to be the default microseconds
                PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => (
                    (i64::from(epb.ts_high) << 32) | i64::from(epb.ts_low),
                    epb.caplen,
                    epb.origlen,
                    epb.data,
                ),
                // Simple packet blocks carry no timestamp
                PcapBlockOwned::NG(Block::SimplePacket(spb)) => (0, spb.data.len() as u32, spb.origlen, spb.data),
                _ => return None,
            };

            *frame_number += 1;
            Some(RawPacket::new(*frame_number, ts, caplen, origlen, *link_type, data.to_vec()))
        };

        match blocks {
            Blocks::Pcap(reader) => pull(reader, frame, &mut to_frame),
            Blocks::PcapNg(reader) => pull(reader, frame, &mut to_frame),
        }
    }
}

/// Advance `reader` until `to_frame` accepts a block or the file ends.
fn pull<R, F>(reader: &mut R, frame: u64, to_frame: &mut F) -> Result<Option<RawPacket>, Error>
where
    R: PcapReaderIterator,
    F: FnMut(PcapBlockOwned<'_>) -> Option<RawPacket>,
{
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let packet = to_frame(block);
                reader.consume(offset);
                if packet.is_some() {
                    return Ok(packet);
                }
            }
            Err(PcapError::Eof) => return Ok(None),
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| truncated(frame, format!("read failed after frame {frame}: {e}")))?;
            }
            Err(e) => return Err(truncated(frame, format!("malformed block: {e}"))),
        }
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::Pcap(CaptureError::InvalidFormat { reason: reason.into() })
}

fn truncated(frame: u64, reason: String) -> Error {
    Error::Pcap(CaptureError::TruncatedPacket { frame, reason })
}

fn open_file(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|_| {
        Error::Pcap(CaptureError::FileNotFound {
            path: path.display().to_string(),
        })
    })
}

fn open_source(path: &Path, gzipped: bool) -> Result<Box<dyn Read + Send>, Error> {
    let file = open_file(path)?;
    Ok(if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    })
}

fn starts_with_gzip_magic(path: &Path) -> Result<bool, Error> {
    let mut magic = [0u8; 2];
    Ok(open_file(path)?.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC)
}

/// True for `*.gz` names, case-insensitively.
pub fn is_gzip_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

impl Iterator for PcapReader {
    type Item = Result<RawPacket, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::PcapFileBuilder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip_extension("ultra1-a.pcap.gz"));
        assert!(is_gzip_extension("ULTRA1-A.PCAP.GZ"));
        assert!(!is_gzip_extension("ultra1-a.pcap"));

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0x1f, 0x8b, 0x08, 0x00]).unwrap();
        temp.flush().unwrap();
        assert!(starts_with_gzip_magic(temp.path()).unwrap());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::detect([0xd4, 0xc3, 0xb2, 0xa1]), Some(Format::Pcap { nanos: false }));
        assert_eq!(Format::detect([0xa1, 0xb2, 0x3c, 0x4d]), Some(Format::Pcap { nanos: true }));
        assert_eq!(Format::detect([0x0a, 0x0d, 0x0d, 0x0a]), Some(Format::PcapNg));
        assert_eq!(Format::detect([0xde, 0xad, 0xbe, 0xef]), None);
    }

    #[test]
    fn test_open_missing_file() {
        let err = PcapReader::open("/definitely/not/here.pcap").err().unwrap();
        assert!(err.is_open_failure());
    }

    #[test]
    fn test_open_unknown_magic() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x00]).unwrap();
        temp.flush().unwrap();

        let err = PcapReader::open(temp.path()).err().unwrap();
        assert!(matches!(err, Error::Pcap(CaptureError::InvalidFormat { .. })));
    }

    #[test]
    fn test_frames_in_file_order() {
        let temp = PcapFileBuilder::new()
            .frame(1_000_000_000_000_000, vec![0xaa; 20])
            .frame(1_000_000_000_500_000, vec![0xbb; 30])
            .write_temp();

        let mut reader = PcapReader::open(temp.path()).unwrap();
        let first = reader.next_packet().unwrap().unwrap();
        let second = reader.next_packet().unwrap().unwrap();

        assert_eq!(first.frame_number, 1);
        assert_eq!(first.data.len(), 20);
        assert_eq!(second.frame_number, 2);
        assert_eq!(second.timestamp_us, 1_000_000_000_500_000);
        assert_eq!(reader.link_type(), 1);
        assert!(reader.next_packet().unwrap().is_none());
        assert_eq!(reader.frame_count(), 2);
    }

    #[test]
    fn test_nanosecond_timestamps_truncate_to_micros() {
        let temp = PcapFileBuilder::new()
            .nanosecond()
            .frame(1_000_000_000_123_456, vec![0xaa; 20])
            .write_temp();

        let mut reader = PcapReader::open(temp.path()).unwrap();
        let packet = reader.next_packet().unwrap().unwrap();
        assert_eq!(packet.timestamp_us, 1_000_000_000_123_456);
    }

    #[test]
    fn test_link_type_from_header() {
        let temp = PcapFileBuilder::new().link_type(113).frame(0, vec![0; 16]).write_temp();

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.next_packet().unwrap().unwrap().link_type, 113);
    }

    #[test]
    fn test_gzipped_capture() {
        let capture = PcapFileBuilder::new().frame(0, vec![0xff; 14]).frame(1, vec![0xee; 14]).build();

        let temp = tempfile::Builder::new().suffix(".pcap.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(File::create(temp.path()).unwrap(), Compression::default());
        encoder.write_all(&capture).unwrap();
        encoder.finish().unwrap();

        let reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.filter_map(|r| r.ok()).count(), 2);
    }
}
