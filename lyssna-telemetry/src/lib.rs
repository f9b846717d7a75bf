//! # Lyssna Telemetry
//!
//! Logging initialisation and capture-loop metrics.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::{CaptureMetrics, MetricsError};
