//! ## lyssna-telemetry::metrics
//! Prometheus counters for the capture loop.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

pub use prometheus::Error as MetricsError;

/// Capture-loop metrics backed by their own registry.
///
/// Cloning is cheap and every clone records into the same series.
#[derive(Debug, Clone)]
pub struct CaptureMetrics {
    registry: Registry,
    dispatched: IntCounter,
    timeouts: IntCounter,
    errors: IntCounter,
    packet_size: Histogram,
}

impl CaptureMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let dispatched = IntCounter::new(
            "lyssna_packets_dispatched_total",
            "Packets handed to the capture callback",
        )?;
        let timeouts = IntCounter::new(
            "lyssna_retrieval_timeouts_total",
            "Retrievals that ended in a read timeout",
        )?;
        let errors = IntCounter::new(
            "lyssna_retrieval_errors_total",
            "Retrievals that failed and ended a capture loop",
        )?;
        let packet_size = Histogram::with_opts(
            HistogramOpts::new("lyssna_packet_size_bytes", "Captured bytes per packet")
                .buckets(vec![64.0, 128.0, 256.0, 512.0, 1024.0, 1514.0, 9000.0, 65535.0]),
        )?;

        registry.register(Box::new(dispatched.clone()))?;
        registry.register(Box::new(timeouts.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(packet_size.clone()))?;

        Ok(Self {
            registry,
            dispatched,
            timeouts,
            errors,
            packet_size,
        })
    }

    #[inline]
    pub fn record_dispatch(&self, captured_len: usize) {
        self.dispatched.inc();
        self.packet_size.observe(captured_len as f64);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.inc();
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.inc();
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.get()
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.get()
    }

    pub fn errors(&self) -> u64 {
        self.errors.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders every series in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Msg(e.to_string()))
    }
}
