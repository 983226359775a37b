//! Integration tests for capture decoding.
//!
//! Writes small captures by hand and runs them through the filtered readers
//! and record decoders used by the bulk and routing paths.

use std::io::Write;
use std::net::Ipv4Addr;

use md5::{Digest, Md5};
use pcapreduce_core::{
    bulk_packets, first_source_address, route_updates, time_bounds, CaptureFilter, CaptureReader,
};

const BULK_FILTER: &str = "not dst host 224.0.0.9 and udp and not host 192.168.240.10";
const ROUTING_FILTER: &str = "dst host 224.0.0.9";

/// Build an Ethernet/IPv4/UDP frame.
fn build_udp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16, id: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();

    // Ethernet header
    packet.extend_from_slice(&[0x01, 0x00, 0x5e, 0x00, 0x00, 0x09]); // dst MAC
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // src MAC
    packet.extend_from_slice(&[0x08, 0x00]); // ethertype: IPv4

    // IPv4 header
    let total_len = 20 + 8 + payload.len() as u16;
    packet.push(0x45); // Version 4, IHL 5
    packet.push(0x00); // DSCP + ECN
    packet.extend_from_slice(&total_len.to_be_bytes());
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&[0x40, 0x00]); // Don't fragment
    packet.push(0x40); // TTL: 64
    packet.push(0x11); // Protocol: UDP
    packet.extend_from_slice(&[0x00, 0x00]); // Checksum
    packet.extend_from_slice(&src);
    packet.extend_from_slice(&dst);

    // UDP header
    packet.extend_from_slice(&src_port.to_be_bytes());
    packet.extend_from_slice(&dst_port.to_be_bytes());
    packet.extend_from_slice(&(8 + payload.len() as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]); // Checksum
    packet.extend_from_slice(payload);

    packet
}

/// Build a RIP response with the given entries.
fn build_rip_payload(entries: &[([u8; 4], u32)]) -> Vec<u8> {
    let mut payload = vec![0x02, 0x01, 0x00, 0x00]; // Response, version 1
    for (address, metric) in entries {
        payload.extend_from_slice(&[0x00, 0x02, 0x00, 0x00]); // AF_INET, tag 0
        payload.extend_from_slice(address);
        payload.extend_from_slice(&[255, 255, 255, 0]);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        payload.extend_from_slice(&metric.to_be_bytes());
    }
    payload
}

/// Write a little-endian microsecond PCAP file.
fn write_pcap(frames: &[(u32, u32, Vec<u8>)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".pcap").tempfile().unwrap();

    let mut header = Vec::new();
    header.extend_from_slice(&[0xd4, 0xc3, 0xb2, 0xa1]); // magic
    header.extend_from_slice(&[0x02, 0x00, 0x04, 0x00]); // version 2.4
    header.extend_from_slice(&[0u8; 8]); // thiszone, sigfigs
    header.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
    header.extend_from_slice(&1u32.to_le_bytes()); // Ethernet
    file.write_all(&header).unwrap();

    for (secs, micros, data) in frames {
        file.write_all(&secs.to_le_bytes()).unwrap();
        file.write_all(&micros.to_le_bytes()).unwrap();
        file.write_all(&(data.len() as u32).to_le_bytes()).unwrap();
        file.write_all(&(data.len() as u32).to_le_bytes()).unwrap();
        file.write_all(data).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_single_frame_fingerprint() {
    let frame = build_udp_frame([192, 168, 7, 10], [192, 168, 1, 20], 5000, 6000, 0x1234, b"AB");
    let capture = write_pcap(&[(1_672_531_200, 0, frame)]);

    let reader = CaptureReader::open(capture.path(), Some(CaptureFilter::parse(BULK_FILTER).unwrap())).unwrap();
    let packets: Vec<_> = bulk_packets(reader).collect();
    assert_eq!(packets.len(), 1);

    let canonical: [u8; 16] = [
        0x45, // version 4, IHL 5
        0x1e, 0x00, // total length 30
        0x34, 0x12, // identification 0x1234
        0x00, 0x40, // flags: don't fragment
        0x11, // UDP
        10, 7, 168, 192, // 192.168.7.10 reversed
        20, 1, 168, 192, // 192.168.1.20 reversed
    ];
    let mut hasher = Md5::new();
    hasher.update(canonical);
    hasher.update([0x41, 0x42]);
    let expected = hex::encode(hasher.finalize());

    let packet = &packets[0];
    assert_eq!(packet.fingerprint, expected);
    assert_eq!(packet.source, Ipv4Addr::new(192, 168, 7, 10));
    assert_eq!(packet.destination_port, 6000);
    assert_eq!(packet.identification, 0x1234);
    assert_eq!(
        packet.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        "2023-01-01 00:00:00.000000"
    );
}

#[test]
fn test_two_paths_over_one_capture() {
    let rip = build_rip_payload(&[([10, 0, 1, 0], 1), ([10, 0, 2, 0], 2)]);
    let capture = write_pcap(&[
        (100, 5, build_udp_frame([192, 168, 7, 10], [192, 168, 1, 20], 5000, 6000, 1, b"one")),
        (100, 1, build_udp_frame([192, 168, 7, 1], [224, 0, 0, 9], 520, 520, 0, &rip)),
        (100, 9, build_udp_frame([192, 168, 7, 10], [192, 168, 240, 10], 5000, 6000, 2, b"infra")),
        (101, 0, build_udp_frame([192, 168, 3, 10], [192, 168, 7, 10], 5000, 6000, 3, b"two")),
    ]);

    let bulk = CaptureReader::open(capture.path(), Some(CaptureFilter::parse(BULK_FILTER).unwrap())).unwrap();
    let routing =
        CaptureReader::open(capture.path(), Some(CaptureFilter::parse(ROUTING_FILTER).unwrap())).unwrap();

    let ids: Vec<u16> = bulk_packets(bulk).map(|p| p.identification).collect();
    assert_eq!(ids, vec![1, 3]);

    let updates: Vec<_> = route_updates(routing).collect();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].observed, updates[1].observed);
    assert_eq!(updates[1].entry.metric, 2);

    let discovery = first_source_address(capture.path(), &CaptureFilter::parse(ROUTING_FILTER).unwrap()).unwrap();
    assert_eq!(discovery, Some(Ipv4Addr::new(192, 168, 7, 1)));

    let (start, end) = time_bounds(capture.path()).unwrap().unwrap();
    assert_eq!(start.timestamp_micros(), 100_000_001);
    assert_eq!(end.timestamp_micros(), 101_000_000);
}

#[test]
fn test_fragmented_datagrams_are_not_fingerprinted() {
    let whole = build_udp_frame([192, 168, 7, 10], [192, 168, 1, 20], 5000, 6000, 1, b"AB");

    // Same bytes with More Fragments set and offset 0
    let mut first_fragment = build_udp_frame([192, 168, 7, 10], [192, 168, 1, 20], 5000, 6000, 2, b"AB");
    first_fragment[20..22].copy_from_slice(&[0x20, 0x00]);

    // Trailing fragment at offset 8 bytes
    let mut later_fragment = build_udp_frame([192, 168, 7, 10], [192, 168, 1, 20], 5000, 6000, 3, b"AB");
    later_fragment[20..22].copy_from_slice(&[0x00, 0x01]);

    let capture = write_pcap(&[(100, 0, whole), (100, 1, first_fragment), (100, 2, later_fragment)]);

    let reader = CaptureReader::open(capture.path(), Some(CaptureFilter::parse(BULK_FILTER).unwrap())).unwrap();
    let ids: Vec<u16> = bulk_packets(reader).map(|p| p.identification).collect();
    assert_eq!(ids, vec![1]);
}
