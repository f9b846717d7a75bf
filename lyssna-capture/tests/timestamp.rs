mod common;

use common::{udp_frame, CaptureFileBuilder};
use lyssna_capture::{CaptureDevice, Timestamp, TimestampResolution};
use lyssna_config::DeviceConfig;

fn first_timestamp(path: &std::path::Path, requested: Option<TimestampResolution>) -> Timestamp {
    let mut config = DeviceConfig::default();
    if let Some(resolution) = requested {
        config = config.with_timestamp_resolution(resolution);
    }
    let mut device = CaptureDevice::from_file(path);
    device.open(&config).unwrap();
    let capture = device.next_packet().into_packet().unwrap();
    assert_eq!(capture.header().timestamp.resolution(), device.timestamp_resolution().unwrap());
    capture.header().timestamp
}

#[test]
fn nanosecond_file_renders_both_resolutions() {
    let dir = tempfile::tempdir().unwrap();
    let path = CaptureFileBuilder::nanosecond()
        .packet_at(1_700_000_000, 123_456_789, udp_frame(1, 2, b"ts"))
        .write_to(dir.path(), "nano.pcap");

    let nanos = first_timestamp(&path, Some(TimestampResolution::Nanosecond));
    let micros = first_timestamp(&path, Some(TimestampResolution::Microsecond));

    assert_eq!(nanos.to_string(), "1700000000.123456789");
    assert_eq!(micros.to_string(), "1700000000.123456");
    assert_eq!(nanos.seconds(), micros.seconds());
}

#[test]
fn microsecond_file_scales_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = CaptureFileBuilder::new()
        .packet_at(1_700_000_000, 654_321, udp_frame(1, 2, b"ts"))
        .write_to(dir.path(), "micro.pcap");

    let nanos = first_timestamp(&path, Some(TimestampResolution::Nanosecond));
    assert_eq!(nanos.to_string(), "1700000000.654321000");
    assert_eq!(nanos.as_nanos(), 1_700_000_000_654_321_000);
}

#[test]
fn unset_request_negotiates_microseconds() {
    let dir = tempfile::tempdir().unwrap();
    let path = CaptureFileBuilder::nanosecond()
        .packet_at(1_700_000_000, 5, udp_frame(1, 2, b"ts"))
        .write_to(dir.path(), "default.pcap");

    let ts = first_timestamp(&path, None);
    assert_eq!(ts.resolution(), TimestampResolution::Microsecond);
    assert_eq!(ts.to_string(), "1700000000.000000");
}
