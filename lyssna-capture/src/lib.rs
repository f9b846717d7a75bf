//! # Lyssna Capture
//!
//! One capture-device contract over live interfaces, saved capture files and
//! pre-opened OS handles.
//!
//! - [`CaptureDevice`]: open/close lifecycle, single-packet retrieval,
//!   filtering, statistics and the capture loop
//! - [`HandleBridge`]: ownership of caller-supplied OS handles
//! - [`timestamp`]: resolution negotiation and decoding
//! - [`container`]: capture-file header probing

pub mod container;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handle;
pub mod packet;
pub mod source;
pub mod stats;
pub mod timestamp;

mod engine;

pub use device::CaptureDevice;
pub use dispatch::{CaptureLimit, CaptureSummary, PacketSource, StopHandle, StopReason};
pub use error::CaptureError;
pub use filter::FilterProgram;
pub use handle::{HandleBridge, NativeHandle};
pub use packet::{LinkType, PacketCaptureEvent, PacketHeader, RawCapture, Retrieval};
pub use source::SourceKind;
pub use stats::CaptureStatistics;
pub use timestamp::Timestamp;

pub use lyssna_config::{DeviceConfig, TimestampResolution};
