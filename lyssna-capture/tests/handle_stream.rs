//! A stream handle skips the header check, so the engine is the one that
//! refuses it. Kept in its own test binary so no concurrent test can reuse
//! the descriptor number before the check.
#![cfg(unix)]

use std::fs::File;
use std::io::Write;
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use lyssna_capture::{CaptureDevice, CaptureError};
use lyssna_config::DeviceConfig;

fn descriptor_is_open(fd: RawFd) -> bool {
    // SAFETY: the File is never dropped, so nothing is closed here.
    let view = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    view.metadata().is_ok()
}

#[test]
fn engine_refusal_closes_the_stream() {
    let (reader, mut writer) = UnixStream::pair().unwrap();
    writer.write_all(&[0x42; 64]).unwrap();
    drop(writer);
    let fd = reader.as_raw_fd();

    let mut device = CaptureDevice::from_handle(OwnedFd::from(reader));
    assert!(matches!(
        device.open(&DeviceConfig::default()),
        Err(CaptureError::Engine(_))
    ));
    assert!(!device.is_open());
    assert!(device.file_handle().unwrap().is_released());
    assert!(!descriptor_is_open(fd));

    assert!(matches!(device.close(), Err(CaptureError::NotOpen)));
    drop(device);
    assert!(!descriptor_is_open(fd));
}
