//! Adapter over the native capture engine (libpcap through the `pcap` crate).
//!
//! Nothing outside this module touches `pcap::Capture` directly.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use lyssna_config::{DeviceConfig, TimestampResolution};
use pcap::{Activated, Capture, Device};
use tracing::debug;

use crate::error::CaptureError;
use crate::handle::EngineHandle;
use crate::packet::{LinkType, PacketHeader, RawCapture, Retrieval};
use crate::stats::CaptureStatistics;
use crate::timestamp::{to_precision, Timestamp};

/// An activated engine capture plus what was negotiated when it opened.
pub(crate) struct Engine {
    capture: Capture<dyn Activated>,
    link_type: LinkType,
    resolution: TimestampResolution,
}

impl Engine {
    fn new(capture: Capture<dyn Activated>, resolution: TimestampResolution) -> Self {
        let link_type = LinkType::from(capture.get_datalink());
        Self {
            capture,
            link_type,
            resolution,
        }
    }

    pub(crate) fn open_live(
        interface: &str,
        config: &DeviceConfig,
        resolution: TimestampResolution,
    ) -> Result<Self, CaptureError> {
        let mut inactive = Capture::from_device(interface)?.precision(to_precision(resolution));
        if let Some(snaplen) = config.snapshot_length {
            inactive = inactive.snaplen(snaplen);
        }
        if let Some(promisc) = config.promiscuous {
            inactive = inactive.promisc(promisc);
        }
        if let Some(timeout) = config.read_timeout_ms {
            inactive = inactive.timeout(i32::try_from(timeout).unwrap_or(i32::MAX));
        }
        if let Some(buffer_size) = config.buffer_size {
            inactive = inactive.buffer_size(i32::try_from(buffer_size).unwrap_or(i32::MAX));
        }

        match inactive.open() {
            Ok(active) => Ok(Self::new(active.into(), resolution)),
            Err(err) if !interface_exists(interface) => {
                debug!(%interface, error = %err, "interface unknown to the engine");
                Err(CaptureError::DeviceNotFound(interface.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn open_file(path: &Path, resolution: TimestampResolution) -> Result<Self, CaptureError> {
        let offline = Capture::from_file_with_precision(path, to_precision(resolution))?;
        Ok(Self::new(offline.into(), resolution))
    }

    /// Opens a capture over a translated OS handle.
    ///
    /// The engine takes the handle over; dropping the returned engine closes
    /// it. On error the handle must be treated as consumed.
    pub(crate) fn open_handle(
        handle: EngineHandle,
        resolution: TimestampResolution,
    ) -> Result<Self, CaptureError> {
        match handle {
            #[cfg(unix)]
            EngineHandle::Descriptor(fd) => {
                // SAFETY: the bridge gave up ownership of `fd` when it
                // translated it, so the engine becomes its only owner. On
                // error the descriptor stays open and the bridge reclaims it.
                let offline =
                    unsafe { Capture::from_raw_fd_with_precision(fd, to_precision(resolution))? };
                Ok(Self::new(offline.into(), resolution))
            }
        }
    }

    pub(crate) fn next_record(&mut self) -> Retrieval {
        let link_type = self.link_type;
        let resolution = self.resolution;
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = PacketHeader {
                    timestamp: Timestamp::from_timeval(
                        packet.header.ts.tv_sec as i64,
                        packet.header.ts.tv_usec as i64,
                        resolution,
                    ),
                    original_length: packet.header.len,
                    captured_length: packet.header.caplen,
                    link_type,
                };
                Retrieval::Packet(RawCapture::new(header, Bytes::copy_from_slice(packet.data)))
            }
            Err(pcap::Error::TimeoutExpired) => Retrieval::Timeout,
            Err(pcap::Error::NoMorePackets) => Retrieval::Eof,
            Err(err) => Retrieval::Error(err.into()),
        }
    }

    /// Compiles and installs `expression`. The previous program stays in
    /// place if compilation fails.
    pub(crate) fn install_filter(&mut self, expression: &str) -> Result<(), pcap::Error> {
        self.capture.filter(expression, true)
    }

    pub(crate) fn statistics(&mut self) -> Result<CaptureStatistics, CaptureError> {
        Ok(self.capture.stats()?.into())
    }

    pub(crate) fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub(crate) fn resolution(&self) -> TimestampResolution {
        self.resolution
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("link_type", &self.link_type)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

/// Live interfaces the engine can open, as `(name, description)`.
pub(crate) fn list_interfaces() -> Result<Vec<(String, Option<String>)>, CaptureError> {
    Ok(Device::list()?
        .into_iter()
        .map(|device| (device.name, device.desc))
        .collect())
}

fn interface_exists(interface: &str) -> bool {
    // Enumeration failing says nothing about the interface itself.
    list_interfaces()
        .map(|devices| devices.iter().any(|(name, _)| name == interface))
        .unwrap_or(true)
}
