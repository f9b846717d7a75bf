//! Error taxonomy for capture devices.

use lyssna_config::ConfigError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::container::ContainerError;
use crate::source::SourceKind;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("device not open")]
    NotOpen,

    #[error("device already open")]
    AlreadyOpen,

    #[error("{operation} is unsupported on {kind} devices")]
    Unsupported {
        operation: &'static str,
        kind: SourceKind,
    },

    #[error("cannot compile filter '{expression}': {reason}")]
    FilterCompile { expression: String, reason: String },

    #[error("OS handle invalid: {0}")]
    HandleInvalid(String),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("capture limit must be a positive packet count")]
    InvalidLimit,

    #[error("capture device '{0}' not found")]
    DeviceNotFound(String),

    #[error("capture file header: {0}")]
    Container(#[from] ContainerError),

    #[error("metrics registry: {0}")]
    Metrics(#[from] lyssna_telemetry::metrics::MetricsError),

    #[error("capture engine: {0}")]
    Engine(#[from] pcap::Error),
}

impl From<ValidationErrors> for CaptureError {
    fn from(errors: ValidationErrors) -> Self {
        CaptureError::Configuration(ConfigError::from(errors))
    }
}
