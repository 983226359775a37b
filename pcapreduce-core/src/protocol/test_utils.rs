//! Frame and capture-file builders for tests and fuzz seeds.
//!
//! Each layer builder keeps its header as the bytes that go on the wire and
//! patches fields in place, so a test can still corrupt any byte of the
//! result afterwards.

use std::io::Write;
use std::path::Path;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const RIP_PORT: u16 = 520;

/// Ethernet II frame, broadcast destination.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    header: [u8; 14],
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        let mut header = [0xff; 14];
        header[6..12].copy_from_slice(&[0x02, 0x00, 0x5e, 0x10, 0x00, 0x07]);
        header[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        Self {
            header,
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.header[6..12].copy_from_slice(&mac);
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.header[12..14].copy_from_slice(&ethertype.to_be_bytes());
        self
    }

    pub fn arp(self) -> Self {
        self.ethertype(ETHERTYPE_ARP)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        [&self.header[..], &self.payload].concat()
    }
}

/// IPv4 datagram without options. The header checksum is filled in by `build`.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    header: [u8; 20],
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            header: [
                0x45, 0x00, // version 4, IHL 5, DSCP/ECN
                0x00, 0x14, // total length
                0x00, 0x01, // identification
                0x00, 0x00, // flags, fragment offset
                64, 17, // TTL, UDP
                0x00, 0x00, // checksum
                192, 168, 1, 1, // source
                192, 168, 1, 2, // destination
            ],
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.header[9] = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(6)
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    pub fn icmp(self) -> Self {
        self.protocol(1)
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.header[4..6].copy_from_slice(&id.to_be_bytes());
        self
    }

    /// Raw flags and fragment-offset word.
    pub fn flags_fragment(mut self, raw: u16) -> Self {
        self.header[6..8].copy_from_slice(&raw.to_be_bytes());
        self
    }

    pub fn src_ip(mut self, ip: [u8; 4]) -> Self {
        self.header[12..16].copy_from_slice(&ip);
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 4]) -> Self {
        self.header[16..20].copy_from_slice(&ip);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let total = (self.header.len() + self.payload.len()) as u16;
        self.header[2..4].copy_from_slice(&total.to_be_bytes());
        let checksum = internet_checksum(&self.header);
        self.header[10..12].copy_from_slice(&checksum.to_be_bytes());
        [&self.header[..], &self.payload].concat()
    }
}

/// Ones' complement sum over 16-bit words, checksum field zeroed.
fn internet_checksum(header: &[u8]) -> u16 {
    let sum = header
        .chunks(2)
        .enumerate()
        .filter(|(i, _)| *i != 5)
        .map(|(_, word)| u32::from(u16::from_be_bytes([word[0], *word.get(1).unwrap_or(&0)])))
        .sum::<u32>();
    let folded = (sum & 0xffff) + (sum >> 16);
    !(((folded & 0xffff) + (folded >> 16)) as u16)
}

/// UDP datagram with a zero (absent) checksum.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    ports: [u16; 2],
    payload: Vec<u8>,
}

impl Default for UdpBuilder {
    fn default() -> Self {
        Self {
            ports: [40000, 6000],
            payload: Vec::new(),
        }
    }
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.ports[0] = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.ports[1] = port;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let [src, dst] = self.ports;
        let length = (8 + self.payload.len()) as u16;
        [src, dst, length, 0]
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .chain(self.payload)
            .collect()
    }
}

/// RIP message; defaults to a version 2 response with no entries.
#[derive(Debug, Clone)]
pub struct RipBuilder {
    bytes: Vec<u8>,
}

impl Default for RipBuilder {
    fn default() -> Self {
        Self {
            bytes: vec![2, 2, 0, 0],
        }
    }
}

impl RipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: u8) -> Self {
        self.bytes[0] = command;
        self
    }

    pub fn version(mut self, version: u8) -> Self {
        self.bytes[1] = version;
        self
    }

    /// Append an AF_INET route entry with a zero route tag.
    pub fn entry(mut self, address: [u8; 4], netmask: [u8; 4], next_hop: [u8; 4], metric: u32) -> Self {
        self.bytes.extend_from_slice(&[0, 2, 0, 0]);
        for part in [address, netmask, next_hop, metric.to_be_bytes()] {
            self.bytes.extend_from_slice(&part);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Ethernet/IPv4/UDP frame from `src:src_port` to `dst:dst_port`.
pub fn udp_frame(
    src: [u8; 4],
    src_port: u16,
    dst: [u8; 4],
    dst_port: u16,
    identification: u16,
    payload: &[u8],
) -> Vec<u8> {
    let datagram = UdpBuilder::new()
        .src_port(src_port)
        .dst_port(dst_port)
        .payload(payload.to_vec())
        .build();
    let packet = Ipv4Builder::new()
        .identification(identification)
        .src_ip(src)
        .dst_ip(dst)
        .payload(datagram)
        .build();
    EthernetBuilder::new().payload(packet).build()
}

/// RIP message on port 520 from `src` to `dst`.
pub fn rip_frame(src: [u8; 4], dst: [u8; 4], rip: RipBuilder) -> Vec<u8> {
    udp_frame(src, RIP_PORT, dst, RIP_PORT, 0, &rip.build())
}

/// Legacy little-endian PCAP writer.
#[derive(Debug, Clone)]
pub struct PcapFileBuilder {
    nanosecond: bool,
    link_type: u32,
    frames: Vec<(i64, Vec<u8>)>,
}

impl Default for PcapFileBuilder {
    fn default() -> Self {
        Self {
            nanosecond: false,
            link_type: 1,
            frames: Vec::new(),
        }
    }
}

impl PcapFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the nanosecond magic and store fractions in nanoseconds.
    pub fn nanosecond(mut self) -> Self {
        self.nanosecond = true;
        self
    }

    pub fn link_type(mut self, link_type: u32) -> Self {
        self.link_type = link_type;
        self
    }

    /// Append a frame stamped `timestamp_us` microseconds after the epoch.
    pub fn frame(mut self, timestamp_us: i64, data: Vec<u8>) -> Self {
        self.frames.push((timestamp_us, data));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let magic: u32 = if self.nanosecond { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
        // magic, version 2.4, zone, sigfigs, snaplen, link type
        let mut out: Vec<u8> = [magic, 0x0004_0002, 0, 0, 0xffff, self.link_type]
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();

        for (timestamp_us, data) in &self.frames {
            let micros = timestamp_us.rem_euclid(1_000_000) as u32;
            let record = [
                timestamp_us.div_euclid(1_000_000) as u32,
                if self.nanosecond { micros * 1_000 } else { micros },
                data.len() as u32,
                data.len() as u32,
            ];
            out.extend(record.iter().flat_map(|word| word.to_le_bytes()));
            out.extend_from_slice(data);
        }
        out
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.build())?;
        file.flush()
    }

    /// Write to a fresh temporary `.pcap` file.
    pub fn write_temp(&self) -> tempfile::NamedTempFile {
        let temp = tempfile::Builder::new()
            .suffix(".pcap")
            .tempfile()
            .expect("create temporary capture");
        self.write_to(temp.path()).expect("write temporary capture");
        temp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_checksum_verifies() {
        let packet = Ipv4Builder::new().payload(vec![1, 2, 3]).build();
        // Summing a header with its checksum in place folds to 0xffff
        let sum: u32 = packet[..20]
            .chunks(2)
            .map(|w| u32::from(u16::from_be_bytes([w[0], w[1]])))
            .sum();
        let folded = (sum & 0xffff) + (sum >> 16);
        assert_eq!((folded & 0xffff) + (folded >> 16), 0xffff);
        assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), 23);
    }

    #[test]
    fn test_pcap_header_layout() {
        let bytes = PcapFileBuilder::new().build();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(&bytes[4..8], &[2, 0, 4, 0]);
    }
}
