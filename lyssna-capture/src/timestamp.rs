//! Timestamp resolution negotiation and decoding.
//!
//! The engine stores arrival times as a `timeval`-like pair whose second
//! field means microseconds or nanoseconds depending on the precision the
//! handle was opened with. Everything here keeps that pair together with the
//! resolution it was decoded under, so a value can never be rendered with the
//! wrong number of digits.

use std::fmt;

use chrono::{DateTime, Utc};
use lyssna_config::TimestampResolution;
use pcap::Precision;
use serde::{Serialize, Serializer};

use crate::source::SourceKind;

const REPLAY_RESOLUTIONS: &[TimestampResolution] = &[
    TimestampResolution::Nanosecond,
    TimestampResolution::Microsecond,
];

/// Live resolutions assumed per platform.
///
/// The engine bindings drop the result of the precision request, so a
/// libpcap build that refuses nanoseconds still reports success. Such a
/// capture delivers microsecond fractions that are then read as
/// nanoseconds. Request microseconds where that matters.
#[cfg(target_os = "linux")]
const LIVE_RESOLUTIONS: &[TimestampResolution] = &[
    TimestampResolution::Nanosecond,
    TimestampResolution::Microsecond,
];

/// Live resolutions assumed per platform. See the Linux table.
#[cfg(not(target_os = "linux"))]
const LIVE_RESOLUTIONS: &[TimestampResolution] = &[TimestampResolution::Microsecond];

/// Resolutions a source can deliver, best first.
///
/// Saved captures are rescaled by the engine on read, so they offer both
/// regardless of what the file was written with.
pub fn supported_resolutions(kind: SourceKind) -> &'static [TimestampResolution] {
    match kind {
        SourceKind::Live => LIVE_RESOLUTIONS,
        SourceKind::Replay | SourceKind::HandleReplay => REPLAY_RESOLUTIONS,
    }
}

/// Picks the resolution a device will actually use.
///
/// An unset request gets microseconds, the engine default. A request the
/// source cannot honour falls back to the best resolution it does offer.
pub fn negotiate(
    requested: Option<TimestampResolution>,
    supported: &[TimestampResolution],
) -> TimestampResolution {
    match requested {
        None => TimestampResolution::Microsecond,
        Some(resolution) if supported.contains(&resolution) => resolution,
        Some(_) => supported
            .first()
            .copied()
            .unwrap_or(TimestampResolution::Microsecond),
    }
}

pub(crate) fn to_precision(resolution: TimestampResolution) -> Precision {
    match resolution {
        TimestampResolution::Microsecond => Precision::Micro,
        TimestampResolution::Nanosecond => Precision::Nano,
    }
}

/// A packet arrival time, tied to the resolution it was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    seconds: i64,
    fraction: u32,
    resolution: TimestampResolution,
}

impl Timestamp {
    /// Builds a timestamp, carrying any whole seconds out of `fraction`.
    pub fn new(seconds: i64, fraction: u64, resolution: TimestampResolution) -> Self {
        let units = u64::from(resolution.units_per_second());
        Self {
            seconds: seconds.saturating_add((fraction / units) as i64),
            fraction: (fraction % units) as u32,
            resolution,
        }
    }

    /// Decodes the engine's `(tv_sec, tv_usec)` pair.
    pub(crate) fn from_timeval(seconds: i64, fraction: i64, resolution: TimestampResolution) -> Self {
        Self::new(seconds, fraction.max(0) as u64, resolution)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Sub-second part, in units of the resolution.
    pub fn fraction(&self) -> u32 {
        self.fraction
    }

    pub fn resolution(&self) -> TimestampResolution {
        self.resolution
    }

    /// Nanoseconds since the Unix epoch.
    pub fn as_nanos(&self) -> i128 {
        let scale = 1_000_000_000 / self.resolution.units_per_second();
        i128::from(self.seconds) * 1_000_000_000 + i128::from(self.fraction) * i128::from(scale)
    }

    /// `None` when the value is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let scale = 1_000_000_000 / self.resolution.units_per_second();
        DateTime::from_timestamp(self.seconds, self.fraction * scale)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.seconds,
            self.fraction,
            width = self.resolution.fraction_digits()
        )
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
