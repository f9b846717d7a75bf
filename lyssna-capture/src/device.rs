//! # Capture device
//!
//! One contract over every capture source. A device is created Closed from an
//! interface name, a file path or a [`HandleBridge`], acquires its native
//! resources in [`CaptureDevice::open`], and gives them back in
//! [`CaptureDevice::close`] or on drop.
//!
//! ```no_run
//! use lyssna_capture::{CaptureDevice, CaptureLimit};
//! use lyssna_config::DeviceConfig;
//!
//! # fn main() -> Result<(), lyssna_capture::CaptureError> {
//! let mut device = CaptureDevice::from_file("dns.pcap");
//! device.open(&DeviceConfig::default())?;
//! device.set_filter("udp port 53")?;
//! let summary = device.capture(CaptureLimit::Infinite, |event| {
//!     println!("{} bytes", event.capture().data().len());
//! })?;
//! println!("dispatched {}", summary.dispatched);
//! device.close()
//! # }
//! ```

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use lyssna_config::{DeviceConfig, LyssnaConfig, SourceConfig, TimestampResolution};
use lyssna_telemetry::{CaptureMetrics, EventLogger};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::container;
use crate::dispatch::{self, CaptureLimit, CaptureSummary, PacketSource, StopHandle, StopSignal};
use crate::engine::{self, Engine};
use crate::error::CaptureError;
use crate::filter::{self, FilterProgram};
use crate::handle::HandleBridge;
use crate::packet::{LinkType, PacketCaptureEvent, RawCapture, Retrieval};
use crate::source::{Source, SourceKind};
use crate::stats::{self, CaptureStatistics};
use crate::timestamp;

#[derive(Debug)]
struct OpenState {
    engine: Engine,
    filter: Option<FilterProgram>,
    statistics: bool,
}

#[derive(Debug)]
enum DeviceState {
    Closed,
    Open(OpenState),
}

/// A packet capture device.
#[derive(Debug)]
pub struct CaptureDevice {
    name: String,
    description: Option<String>,
    source: Source,
    state: DeviceState,
    stop: Arc<StopSignal>,
    metrics: Option<CaptureMetrics>,
}

impl CaptureDevice {
    fn with_source(name: String, source: Source) -> Self {
        Self {
            name,
            description: None,
            source,
            state: DeviceState::Closed,
            stop: Arc::default(),
            metrics: None,
        }
    }

    /// A device over the live interface `interface`.
    pub fn live(interface: impl Into<String>) -> Self {
        let interface = interface.into();
        Self::with_source(interface.clone(), Source::Live { interface })
    }

    /// A device replaying the capture file at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::with_source(path.display().to_string(), Source::File { path })
    }

    /// A device reading capture data from a caller-supplied OS handle.
    ///
    /// The device becomes the handle's sole owner.
    pub fn from_handle(handle: impl Into<HandleBridge>) -> Self {
        let bridge = handle.into();
        Self::with_source(format!("os-handle:{:?}", bridge.as_raw()), Source::Handle(bridge))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Records every capture loop into `metrics`.
    pub fn attach_metrics(&mut self, metrics: CaptureMetrics) {
        self.metrics = Some(metrics);
    }

    /// Live interfaces known to the engine, as Closed devices.
    pub fn list_live() -> Result<Vec<CaptureDevice>, CaptureError> {
        Ok(engine::list_interfaces()?
            .into_iter()
            .map(|(name, description)| {
                let mut device = CaptureDevice::live(name);
                device.description = description;
                device
            })
            .collect())
    }

    /// A Closed device for a configured source.
    pub fn from_source_config(source: &SourceConfig) -> Result<Self, CaptureError> {
        source.check()?;
        Ok(match source {
            SourceConfig::Live { interface, .. } => CaptureDevice::live(interface.as_str()),
            SourceConfig::File { path, .. } => CaptureDevice::from_file(path.as_path()),
        })
    }

    /// Builds, opens and filters a device from a loaded configuration.
    pub fn open_from_config(config: &LyssnaConfig) -> Result<Self, CaptureError> {
        config.validate()?;
        let mut device = Self::from_source_config(&config.source)?;
        if config.telemetry.metrics {
            device.attach_metrics(CaptureMetrics::new()?);
        }
        device.open(&config.device)?;
        if let Some(expression) = config.source.filter() {
            device.set_filter(expression)?;
        }
        Ok(device)
    }

    /// Acquires native resources according to `config`.
    ///
    /// Options that only make sense for live interfaces are ignored when the
    /// source is a replay.
    #[instrument(level = "info", skip(self, config), fields(device = %self.name, source = %self.kind()))]
    pub fn open(&mut self, config: &DeviceConfig) -> Result<(), CaptureError> {
        if self.is_open() {
            return Err(CaptureError::AlreadyOpen);
        }
        config.validate()?;

        let kind = self.kind();
        let resolution = negotiate(kind, config.timestamp_resolution);
        if kind.is_replay() && config.has_live_only_options() {
            debug!("ignoring live-only options for a replay source");
        }

        let engine = match &mut self.source {
            Source::Live { interface } => Engine::open_live(interface, config, resolution)?,
            Source::File { path } => {
                let header = container::probe_file(path.as_path())?;
                debug!(format = ?header.format, native = ?header.resolution, "capture file header");
                Engine::open_file(path, resolution)?
            }
            Source::Handle(bridge) => {
                let handle = bridge.translate_for_engine()?;
                match Engine::open_handle(handle, resolution) {
                    Ok(engine) => engine,
                    Err(err) => {
                        bridge.reclaim();
                        return Err(err);
                    }
                }
            }
        };

        info!(
            link_type = %engine.link_type(),
            resolution = %engine.resolution(),
            "capture device opened"
        );
        self.state = DeviceState::Open(OpenState {
            engine,
            filter: None,
            statistics: stats::supports_statistics(kind),
        });
        Ok(())
    }

    /// Retrieves the next record that passes the installed filter.
    pub fn next_packet(&mut self) -> Retrieval {
        match &mut self.state {
            DeviceState::Open(open) => open.engine.next_record(),
            DeviceState::Closed => Retrieval::Error(CaptureError::NotOpen),
        }
    }

    /// Releases native resources, including an owned OS handle.
    ///
    /// A Closed device still gives up a handle it owns, for example after a
    /// failed open, and then reports `NotOpen`.
    pub fn close(&mut self) -> Result<(), CaptureError> {
        let DeviceState::Open(open) = mem::replace(&mut self.state, DeviceState::Closed) else {
            if let Source::Handle(bridge) = &mut self.source {
                if !bridge.is_released() {
                    bridge.release();
                    debug!(device = %self.name, "released handle of a closed device");
                }
            }
            return Err(CaptureError::NotOpen);
        };
        drop(open);
        if let Source::Handle(bridge) = &mut self.source {
            bridge.release();
        }
        info!(device = %self.name, "capture device closed");
        Ok(())
    }

    /// Compiles `expression` for this device's link type and installs it.
    ///
    /// On failure the previously installed filter keeps applying.
    pub fn set_filter(&mut self, expression: &str) -> Result<(), CaptureError> {
        let open = self.open_state_mut()?;
        let program = filter::install(&mut open.engine, expression)?;
        open.filter = Some(program);
        Ok(())
    }

    pub fn clear_filter(&mut self) -> Result<(), CaptureError> {
        let open = self.open_state_mut()?;
        filter::clear(&mut open.engine)?;
        open.filter = None;
        Ok(())
    }

    /// Drop counters since capture start. Live devices only.
    pub fn statistics(&mut self) -> Result<CaptureStatistics, CaptureError> {
        let kind = self.kind();
        let open = self.open_state_mut()?;
        if !open.statistics {
            return Err(CaptureError::Unsupported {
                operation: "statistics",
                kind,
            });
        }
        open.engine.statistics()
    }

    /// Runs the capture loop, calling `callback` for every packet.
    ///
    /// If `callback` panics, the panic propagates after the loop state is
    /// reset; the device stays open.
    pub fn capture<F>(&mut self, limit: CaptureLimit, mut callback: F) -> Result<CaptureSummary, CaptureError>
    where
        F: FnMut(PacketCaptureEvent<'_>),
    {
        if !self.is_open() {
            return Err(CaptureError::NotOpen);
        }
        let span = EventLogger::capture_span(&self.name, &self.kind().to_string());
        let _entered = span.enter();
        dispatch::drive(self, limit, |device, capture| {
            callback(PacketCaptureEvent::new(capture, device))
        })
    }

    /// Runs the capture loop, sending every packet to `sender`.
    ///
    /// The loop stops once the receiving side hangs up.
    pub fn capture_to_channel(
        &mut self,
        limit: CaptureLimit,
        sender: &Sender<RawCapture>,
    ) -> Result<CaptureSummary, CaptureError> {
        self.capture(limit, |event| {
            let device = event.device();
            if sender.send(event.into_capture()).is_err() {
                debug!("capture receiver disconnected");
                device.stop_capture();
            }
        })
    }

    /// Asks a running capture loop to stop after the current packet.
    /// Has no effect when no loop is running.
    pub fn stop_capture(&self) -> bool {
        self.stop.request_stop()
    }

    /// A handle that can stop this device's loop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.stop))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DeviceState::Open(_))
    }

    pub fn is_capturing(&self) -> bool {
        self.stop.is_capturing()
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File { path } => Some(path),
            _ => None,
        }
    }

    pub fn link_type(&self) -> Option<LinkType> {
        self.open_state().map(|open| open.engine.link_type())
    }

    /// The resolution negotiated at open.
    pub fn timestamp_resolution(&self) -> Option<TimestampResolution> {
        self.open_state().map(|open| open.engine.resolution())
    }

    pub fn filter(&self) -> Option<&FilterProgram> {
        self.open_state().and_then(|open| open.filter.as_ref())
    }

    /// Decided at open; a Closed device answers for its source kind.
    pub fn supports_statistics(&self) -> bool {
        self.open_state()
            .map(|open| open.statistics)
            .unwrap_or_else(|| stats::supports_statistics(self.kind()))
    }

    pub fn metrics(&self) -> Option<&CaptureMetrics> {
        self.metrics.as_ref()
    }

    /// The bridge of a handle-backed device.
    pub fn file_handle(&self) -> Option<&HandleBridge> {
        match &self.source {
            Source::Handle(bridge) => Some(bridge),
            _ => None,
        }
    }

    fn open_state(&self) -> Option<&OpenState> {
        match &self.state {
            DeviceState::Open(open) => Some(open),
            DeviceState::Closed => None,
        }
    }

    fn open_state_mut(&mut self) -> Result<&mut OpenState, CaptureError> {
        match &mut self.state {
            DeviceState::Open(open) => Ok(open),
            DeviceState::Closed => Err(CaptureError::NotOpen),
        }
    }
}

fn negotiate(kind: SourceKind, requested: Option<TimestampResolution>) -> TimestampResolution {
    let supported = timestamp::supported_resolutions(kind);
    let resolution = timestamp::negotiate(requested, supported);
    if let Some(requested) = requested.filter(|requested| *requested != resolution) {
        warn!(%requested, negotiated = %resolution, "timestamp resolution unavailable, falling back");
    }
    resolution
}

impl PacketSource for CaptureDevice {
    fn next_packet(&mut self) -> Retrieval {
        CaptureDevice::next_packet(self)
    }

    fn stop_signal(&self) -> &Arc<StopSignal> {
        &self.stop
    }

    fn metrics(&self) -> Option<&CaptureMetrics> {
        self.metrics.as_ref()
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}
