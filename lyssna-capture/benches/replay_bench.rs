#[macro_use]
extern crate criterion;

use std::path::{Path, PathBuf};

use criterion::{black_box, Criterion, Throughput};

use lyssna_capture::container::FileHeader;
use lyssna_capture::{CaptureDevice, CaptureLimit, DeviceConfig};

const PACKETS: u32 = 1_000;

// Ethernet / IPv4 / UDP to port 53 with a 32 byte payload.
fn udp_frame(dst_port: u16) -> Vec<u8> {
    let mut frame = vec![0x02, 0, 0, 0, 0, 0x02, 0x02, 0, 0, 0, 0, 0x01, 0x08, 0x00];
    frame.extend_from_slice(&[0x45, 0x00, 0x00, 60, 0, 1, 0x40, 0, 64, 17, 0, 0]);
    frame.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
    frame.extend_from_slice(&40_000u16.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&[0, 40, 0, 0]);
    frame.extend_from_slice(&[0xab; 32]);
    frame
}

fn write_capture(dir: &Path) -> PathBuf {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&[2, 0, 4, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for i in 0..PACKETS {
        let frame = udp_frame(if i % 2 == 0 { 53 } else { 123 });
        out.extend_from_slice(&(1_700_000_000 + i).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&frame);
    }
    let path = dir.join("bench.pcap");
    std::fs::write(&path, out).unwrap();
    path
}

fn benchmark_replay(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());

    let mut group = c.benchmark_group("replay");
    group.throughput(Throughput::Elements(u64::from(PACKETS)));

    group.bench_function("capture_all", |b| {
        b.iter(|| {
            let mut device = CaptureDevice::from_file(&path);
            device.open(&DeviceConfig::default()).unwrap();
            let mut bytes = 0usize;
            device
                .capture(CaptureLimit::Infinite, |event| bytes += event.capture().data().len())
                .unwrap();
            black_box(bytes);
        })
    });

    group.bench_function("capture_filtered", |b| {
        b.iter(|| {
            let mut device = CaptureDevice::from_file(&path);
            device.open(&DeviceConfig::default()).unwrap();
            device.set_filter("udp dst port 53").unwrap();
            black_box(device.capture(CaptureLimit::Infinite, |_| {}).unwrap());
        })
    });

    group.finish();
}

fn benchmark_header_parse(c: &mut Criterion) {
    let header: Vec<u8> = {
        let mut out = 0xa1b2_3c4du32.to_le_bytes().to_vec();
        out.extend_from_slice(&[2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&65535u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out
    };

    c.bench_function("file_header_parse", |b| {
        b.iter(|| black_box(FileHeader::parse(black_box(&header))).unwrap())
    });
}

criterion_group!(benches, benchmark_replay, benchmark_header_parse);
criterion_main!(benches);
