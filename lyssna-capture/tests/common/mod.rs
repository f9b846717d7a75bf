#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use lyssna_capture::TimestampResolution;

pub const BASE_SECONDS: u32 = 1_700_000_000;

/// Writes classic little-endian pcap files.
pub struct CaptureFileBuilder {
    resolution: TimestampResolution,
    link_type: u32,
    records: Vec<(u32, u32, Vec<u8>)>,
}

impl CaptureFileBuilder {
    pub fn new() -> Self {
        Self {
            resolution: TimestampResolution::Microsecond,
            link_type: 1,
            records: Vec::new(),
        }
    }

    pub fn nanosecond() -> Self {
        Self {
            resolution: TimestampResolution::Nanosecond,
            ..Self::new()
        }
    }

    pub fn packet_at(mut self, seconds: u32, fraction: u32, data: Vec<u8>) -> Self {
        self.records.push((seconds, fraction, data));
        self
    }

    /// Appends a packet one second after the previous one.
    pub fn packet(self, data: Vec<u8>) -> Self {
        let seconds = BASE_SECONDS + self.records.len() as u32;
        self.packet_at(seconds, 0, data)
    }

    pub fn packets(self, frames: Vec<Vec<u8>>) -> Self {
        frames.into_iter().fold(self, |builder, frame| builder.packet(frame))
    }

    pub fn bytes(&self) -> Vec<u8> {
        let magic: u32 = match self.resolution {
            TimestampResolution::Microsecond => 0xa1b2_c3d4,
            TimestampResolution::Nanosecond => 0xa1b2_3c4d,
        };
        let mut out = Vec::new();
        out.extend_from_slice(&magic.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&65535u32.to_le_bytes());
        out.extend_from_slice(&self.link_type.to_le_bytes());
        for (seconds, fraction, data) in &self.records {
            out.extend_from_slice(&seconds.to_le_bytes());
            out.extend_from_slice(&fraction.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(data);
        }
        out
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.bytes()).expect("write capture file");
        path
    }
}

const SRC_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(&DST_MAC);
    frame.extend_from_slice(&SRC_MAC);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn ipv4(protocol: u8, payload: &[u8]) -> Vec<u8> {
    let total = 20 + payload.len() as u16;
    let mut packet = vec![0x45, 0x00];
    packet.extend_from_slice(&total.to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 64, protocol, 0x00, 0x00]);
    packet.extend_from_slice(&[10, 0, 0, 1]);
    packet.extend_from_slice(&[10, 0, 0, 2]);
    packet.extend_from_slice(payload);
    packet
}

pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut udp = Vec::new();
    udp.extend_from_slice(&src_port.to_be_bytes());
    udp.extend_from_slice(&dst_port.to_be_bytes());
    udp.extend_from_slice(&(8 + payload.len() as u16).to_be_bytes());
    udp.extend_from_slice(&[0x00, 0x00]);
    udp.extend_from_slice(payload);
    ethernet(0x0800, &ipv4(17, &udp))
}

pub fn tcp_frame(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut tcp = Vec::new();
    tcp.extend_from_slice(&src_port.to_be_bytes());
    tcp.extend_from_slice(&dst_port.to_be_bytes());
    tcp.extend_from_slice(&1u32.to_be_bytes());
    tcp.extend_from_slice(&0u32.to_be_bytes());
    tcp.extend_from_slice(&[0x50, 0x02, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);
    ethernet(0x0800, &ipv4(6, &tcp))
}

pub fn arp_frame() -> Vec<u8> {
    let mut arp = vec![0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01];
    arp.extend_from_slice(&SRC_MAC);
    arp.extend_from_slice(&[10, 0, 0, 1]);
    arp.extend_from_slice(&[0; 6]);
    arp.extend_from_slice(&[10, 0, 0, 2]);
    ethernet(0x0806, &arp)
}

/// Destination port of an Ethernet/IPv4/UDP frame.
pub fn udp_destination_port(frame: &[u8]) -> Option<u16> {
    if frame.len() < 14 + 20 + 8 || frame[12..14] != [0x08, 0x00] {
        return None;
    }
    let ip = &frame[14..];
    if ip[9] != 17 {
        return None;
    }
    let header_len = usize::from(ip[0] & 0x0f) * 4;
    let udp = ip.get(header_len..header_len + 8)?;
    Some(u16::from_be_bytes([udp[2], udp[3]]))
}

/// Six frames; exactly one of them involves port 53 (a UDP query to it).
pub fn mixed_traffic() -> Vec<Vec<u8>> {
    vec![
        tcp_frame(40_000, 80),
        udp_frame(40_001, 123, b"ntp"),
        arp_frame(),
        udp_frame(40_002, 53, b"\x12\x34\x01\x00\x00\x01"),
        udp_frame(40_003, 5353, b"mdns"),
        tcp_frame(40_004, 443),
    ]
}

pub fn mixed_traffic_file(dir: &Path) -> PathBuf {
    CaptureFileBuilder::new()
        .packets(mixed_traffic())
        .write_to(dir, "mixed.pcap")
}
