//! ## lyssna-telemetry::logging
//! Structured logging with `tracing`.
//!
//! Libraries in this workspace only emit events; installing a subscriber is
//! left to the binary (or test) that embeds them.

use tracing::{info_span, Span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Debug)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber.
    ///
    /// `RUST_LOG` wins over `default_directive` when it is set.
    ///
    /// # Panics
    /// If a global subscriber is already installed. Use [`EventLogger::try_init`]
    /// when that is possible.
    pub fn init(default_directive: &str) {
        Self::try_init(default_directive).expect("global tracing subscriber already installed")
    }

    pub fn try_init(default_directive: &str) -> Result<(), TryInitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    }

    /// Span wrapping one run of a capture loop.
    #[inline]
    pub fn capture_span(device: &str, source_kind: &str) -> Span {
        info_span!("capture", device = device, source = source_kind)
    }
}
