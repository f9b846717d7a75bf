//! Kept in its own test binary so the stale descriptor number cannot be
//! handed out to a concurrent test.
#![cfg(unix)]

use std::fs::File;
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd};

use lyssna_capture::{CaptureDevice, CaptureError, HandleBridge};
use lyssna_config::DeviceConfig;

#[test]
fn stale_descriptor_fails_with_handle_invalid() {
    let fd = tempfile::tempfile().unwrap().into_raw_fd();
    // SAFETY: `fd` came from `into_raw_fd` above and is closed exactly here.
    drop(unsafe { File::from_raw_fd(fd) });
    // SAFETY: never dropped.
    let view = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    assert!(view.metadata().is_err());

    // SAFETY: the bridge must cope with a descriptor that is not open; it
    // never closes one it finds invalid.
    let stale = unsafe { OwnedFd::from_raw_fd(fd) };
    let bridge = HandleBridge::from(stale);
    assert!(!bridge.is_valid());

    let mut device = CaptureDevice::from_handle(bridge);
    assert!(matches!(
        device.open(&DeviceConfig::default()),
        Err(CaptureError::HandleInvalid(_))
    ));
    assert!(!device.is_open());
    assert!(device.file_handle().unwrap().is_released());
    assert!(matches!(
        device.open(&DeviceConfig::default()),
        Err(CaptureError::HandleInvalid(_))
    ));
}
