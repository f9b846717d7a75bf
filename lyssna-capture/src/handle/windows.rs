use std::os::windows::io::{AsRawHandle, OwnedHandle};

use super::{EngineHandle, NativeHandle, RawOsHandle};
use crate::error::CaptureError;
use crate::source::SourceKind;

/// A Windows file handle.
///
/// The engine bindings offer no way to read a capture from a raw handle, so
/// translation is refused and the handle stays owned here until release.
#[derive(Debug)]
pub struct OsHandle {
    // Stored as an integer so the wrapper stays `Send`.
    raw: usize,
    handle: Option<OwnedHandle>,
}

impl OsHandle {
    pub fn new(handle: OwnedHandle) -> Self {
        Self {
            raw: handle.as_raw_handle() as usize,
            handle: Some(handle),
        }
    }
}

impl NativeHandle for OsHandle {
    fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    fn translate_for_engine(&mut self) -> Result<EngineHandle, CaptureError> {
        Err(CaptureError::Unsupported {
            operation: "reading from an OS handle",
            kind: SourceKind::HandleReplay,
        })
    }

    fn release(&mut self) -> bool {
        self.handle.take().is_some()
    }

    fn as_raw(&self) -> RawOsHandle {
        self.raw as RawOsHandle
    }
}
