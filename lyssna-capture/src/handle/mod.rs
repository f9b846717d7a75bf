//! Ownership bridge for caller-supplied OS handles.
//!
//! A [`HandleBridge`] takes sole ownership of one OS handle at construction.
//! When the device opens, the handle is translated into the form the engine
//! consumes; from then on the engine closes it, and the bridge only records
//! that it was released. The OS resource is closed exactly once either way.

use std::fmt;
use std::fs::File;

use tracing::warn;

use crate::error::CaptureError;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::FdHandle;
#[cfg(windows)]
pub use windows::OsHandle;

/// Platform identity of a handle, usable for comparison only.
#[cfg(unix)]
pub type RawOsHandle = std::os::fd::RawFd;
#[cfg(windows)]
pub type RawOsHandle = std::os::windows::io::RawHandle;

/// A handle in the form the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineHandle {
    /// A descriptor the engine will `fdopen` and later close.
    #[cfg(unix)]
    Descriptor(std::os::fd::RawFd),
}

/// Platform-specific handle operations.
pub trait NativeHandle: fmt::Debug + Send {
    /// Whether the underlying OS handle still refers to an open resource.
    fn is_valid(&self) -> bool;

    /// Hands the handle over to the engine without duplicating it.
    ///
    /// On success the engine owns the handle and closes it when the capture
    /// is dropped; the implementation must not close it again. A
    /// `HandleInvalid` error means the handle has already been given up.
    fn translate_for_engine(&mut self) -> Result<EngineHandle, CaptureError>;

    /// Gives the handle up. Returns `false` if there was nothing to release.
    fn release(&mut self) -> bool;

    /// Takes back a translated handle the engine failed to open, closing it
    /// if it is still open.
    fn reclaim(&mut self) -> bool {
        self.release()
    }

    fn as_raw(&self) -> RawOsHandle;
}

/// Single owner of one OS handle.
#[derive(Debug)]
pub struct HandleBridge {
    inner: Box<dyn NativeHandle>,
    released: bool,
}

impl HandleBridge {
    pub fn new<H: NativeHandle + 'static>(handle: H) -> Self {
        Self {
            inner: Box::new(handle),
            released: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.released && self.inner.is_valid()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Raw value of the wrapped handle, stable across release.
    pub fn as_raw(&self) -> RawOsHandle {
        self.inner.as_raw()
    }

    pub(crate) fn translate_for_engine(&mut self) -> Result<EngineHandle, CaptureError> {
        if self.released {
            return Err(CaptureError::HandleInvalid(format!(
                "{:?} was already released",
                self.as_raw()
            )));
        }
        self.inner.translate_for_engine().inspect_err(|err| {
            if matches!(err, CaptureError::HandleInvalid(_)) {
                self.released = true;
            }
        })
    }

    /// Releases the handle. A second call is a no-op that returns `false`.
    pub(crate) fn release(&mut self) -> bool {
        if self.released {
            warn!(handle = ?self.as_raw(), "handle already released");
            return false;
        }
        self.released = true;
        self.inner.release()
    }

    /// Releases a handle whose translation the engine refused.
    pub(crate) fn reclaim(&mut self) -> bool {
        if self.released {
            warn!(handle = ?self.as_raw(), "handle already released");
            return false;
        }
        self.released = true;
        self.inner.reclaim()
    }
}

impl Drop for HandleBridge {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}

#[cfg(unix)]
impl From<std::os::fd::OwnedFd> for HandleBridge {
    fn from(fd: std::os::fd::OwnedFd) -> Self {
        HandleBridge::new(FdHandle::new(fd))
    }
}

#[cfg(windows)]
impl From<std::os::windows::io::OwnedHandle> for HandleBridge {
    fn from(handle: std::os::windows::io::OwnedHandle) -> Self {
        HandleBridge::new(OsHandle::new(handle))
    }
}

impl From<File> for HandleBridge {
    fn from(file: File) -> Self {
        #[cfg(unix)]
        let bridge = HandleBridge::from(std::os::fd::OwnedFd::from(file));
        #[cfg(windows)]
        let bridge = HandleBridge::from(std::os::windows::io::OwnedHandle::from(file));
        bridge
    }
}
