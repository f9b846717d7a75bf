use std::fs::File;
use std::io::Seek;
use std::mem::{self, ManuallyDrop};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::FileExt;

use tracing::{debug, warn};

use super::{EngineHandle, NativeHandle, RawOsHandle};
use crate::container::{ContainerError, FileHeader, FILE_HEADER_LEN};
use crate::error::CaptureError;

#[derive(Debug)]
enum FdState {
    Owned(File),
    /// Handed to the engine, which closes it once the capture opens.
    Lent,
    Released,
}

/// A file descriptor owned until the engine takes it over.
#[derive(Debug)]
pub struct FdHandle {
    raw: RawFd,
    state: FdState,
}

impl FdHandle {
    pub fn new(fd: OwnedFd) -> Self {
        Self {
            raw: fd.as_raw_fd(),
            state: FdState::Owned(File::from(fd)),
        }
    }

    /// Reads the container header at the current offset without moving it.
    fn check_header(file: &File) -> Result<(), CaptureError> {
        let mut reader = file;
        let offset = reader.stream_position().map_err(ContainerError::from)?;
        let mut buf = [0u8; FILE_HEADER_LEN];
        let read = file.read_at(&mut buf, offset).map_err(ContainerError::from)?;
        let header = FileHeader::parse(&buf[..read])?;
        debug!(fd = file.as_raw_fd(), format = ?header.format, "capture header at handle offset");
        Ok(())
    }
}

impl NativeHandle for FdHandle {
    fn is_valid(&self) -> bool {
        match &self.state {
            FdState::Owned(file) => file.metadata().is_ok(),
            FdState::Lent => true,
            FdState::Released => false,
        }
    }

    fn translate_for_engine(&mut self) -> Result<EngineHandle, CaptureError> {
        let file = match mem::replace(&mut self.state, FdState::Released) {
            FdState::Owned(file) => file,
            FdState::Lent => {
                self.state = FdState::Lent;
                return Err(CaptureError::HandleInvalid(format!(
                    "fd {} is already held by an open capture",
                    self.raw
                )));
            }
            FdState::Released => {
                return Err(CaptureError::HandleInvalid(format!(
                    "fd {} was already released",
                    self.raw
                )))
            }
        };

        let metadata = match file.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                // Not an open descriptor; closing it again is never safe.
                let _ = file.into_raw_fd();
                return Err(CaptureError::HandleInvalid(format!("fd {}: {}", self.raw, err)));
            }
        };

        if metadata.is_file() {
            if let Err(err) = Self::check_header(&file) {
                self.state = FdState::Owned(file);
                return Err(err);
            }
        }

        self.state = FdState::Lent;
        Ok(EngineHandle::Descriptor(file.into_raw_fd()))
    }

    fn release(&mut self) -> bool {
        match mem::replace(&mut self.state, FdState::Released) {
            FdState::Owned(file) => {
                if file.metadata().is_ok() {
                    drop(file);
                } else {
                    let _ = file.into_raw_fd();
                }
                true
            }
            FdState::Lent => true,
            FdState::Released => {
                warn!(fd = self.raw, "fd already released");
                false
            }
        }
    }

    fn reclaim(&mut self) -> bool {
        if !matches!(self.state, FdState::Lent) {
            return self.release();
        }
        self.state = FdState::Released;

        // libpcap leaves the descriptor open when the offline open fails.
        // SAFETY: the wrapper is only dropped after the descriptor is seen
        // open, and nothing else owns it while Lent.
        let file = ManuallyDrop::new(unsafe { File::from_raw_fd(self.raw) });
        if file.metadata().is_ok() {
            drop(ManuallyDrop::into_inner(file));
            debug!(fd = self.raw, "closed descriptor refused by the engine");
        }
        true
    }

    fn as_raw(&self) -> RawOsHandle {
        self.raw
    }
}
