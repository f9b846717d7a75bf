//! The capture loop.
//!
//! [`drive`] pulls records from any [`PacketSource`] and hands each one to a
//! callback until the source is exhausted, a packet limit is hit, a stop is
//! requested, or retrieval fails. Cancellation is cooperative: a stop request
//! is observed between iterations, after the packet in flight has been
//! dispatched.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lyssna_telemetry::CaptureMetrics;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::CaptureError;
use crate::packet::{RawCapture, Retrieval};

/// How many packets a capture loop may dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureLimit {
    Packets(NonZeroUsize),
    /// Run until the source ends or a stop is requested.
    Infinite,
}

impl CaptureLimit {
    /// A finite limit. Zero is rejected; use [`CaptureLimit::Infinite`].
    pub fn packets(count: usize) -> Result<Self, CaptureError> {
        NonZeroUsize::new(count)
            .map(CaptureLimit::Packets)
            .ok_or(CaptureError::InvalidLimit)
    }

    fn is_reached(&self, dispatched: usize) -> bool {
        match self {
            CaptureLimit::Packets(limit) => dispatched >= limit.get(),
            CaptureLimit::Infinite => false,
        }
    }
}

impl From<NonZeroUsize> for CaptureLimit {
    fn from(count: NonZeroUsize) -> Self {
        CaptureLimit::Packets(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Eof,
    LimitReached,
    Stopped,
}

/// How a capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub dispatched: usize,
    /// Read timeouts seen while polling a live source.
    pub timeouts: usize,
    pub reason: StopReason,
}

/// Shared cancellation state of one device.
#[derive(Debug, Default)]
pub struct StopSignal {
    capturing: AtomicBool,
    stop_requested: AtomicBool,
}

impl StopSignal {
    /// Asks a running loop to stop. Has no effect, and returns `false`, when
    /// no loop is running.
    pub fn request_stop(&self) -> bool {
        if !self.capturing.load(Ordering::Acquire) {
            return false;
        }
        self.stop_requested.store(true, Ordering::Release);
        true
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    fn begin(self: &Arc<Self>) -> CapturingGuard {
        self.stop_requested.store(false, Ordering::Release);
        self.capturing.store(true, Ordering::Release);
        CapturingGuard(Arc::clone(self))
    }

    fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Clears the loop flags however the loop exits, unwinding included.
struct CapturingGuard(Arc<StopSignal>);

impl Drop for CapturingGuard {
    fn drop(&mut self) {
        self.0.capturing.store(false, Ordering::Release);
        self.0.stop_requested.store(false, Ordering::Release);
    }
}

/// Cross-thread handle for stopping a device's capture loop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<StopSignal>);

impl StopHandle {
    pub(crate) fn new(signal: Arc<StopSignal>) -> Self {
        Self(signal)
    }

    /// See [`StopSignal::request_stop`].
    pub fn stop(&self) -> bool {
        self.0.request_stop()
    }

    pub fn is_capturing(&self) -> bool {
        self.0.is_capturing()
    }
}

/// Anything the capture loop can pull records from.
pub trait PacketSource {
    fn next_packet(&mut self) -> Retrieval;

    fn stop_signal(&self) -> &Arc<StopSignal>;

    fn metrics(&self) -> Option<&CaptureMetrics> {
        None
    }
}

/// Runs the capture loop over `source`.
///
/// `dispatch` is called inline for every packet, with shared access to the
/// source. Timeouts keep the loop polling; an error ends it and is returned.
pub fn drive<S, F>(
    source: &mut S,
    limit: CaptureLimit,
    mut dispatch: F,
) -> Result<CaptureSummary, CaptureError>
where
    S: PacketSource + ?Sized,
    F: FnMut(&S, RawCapture),
{
    let signal = Arc::clone(source.stop_signal());
    let _running = signal.begin();
    let metrics = source.metrics().cloned();

    let mut dispatched = 0usize;
    let mut timeouts = 0usize;

    let reason = loop {
        if signal.should_stop() {
            break StopReason::Stopped;
        }
        if limit.is_reached(dispatched) {
            break StopReason::LimitReached;
        }

        match source.next_packet() {
            Retrieval::Packet(capture) => {
                if let Some(metrics) = &metrics {
                    metrics.record_dispatch(capture.data().len());
                }
                dispatch(&*source, capture);
                dispatched += 1;
            }
            Retrieval::Timeout => {
                trace!("read timeout, polling again");
                if let Some(metrics) = &metrics {
                    metrics.record_timeout();
                }
                timeouts += 1;
            }
            Retrieval::Eof => break StopReason::Eof,
            Retrieval::Error(err) => {
                if let Some(metrics) = &metrics {
                    metrics.record_error();
                }
                debug!(dispatched, error = %err, "capture loop failed");
                return Err(err);
            }
        }
    };

    debug!(dispatched, timeouts, ?reason, "capture loop finished");
    Ok(CaptureSummary {
        dispatched,
        timeouts,
        reason,
    })
}
