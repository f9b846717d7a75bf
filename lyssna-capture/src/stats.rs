//! Drop statistics, available from live sources only.

use serde::Serialize;

use crate::source::SourceKind;

/// Counters since capture start, as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStatistics {
    pub packets_received: u64,
    /// Dropped because the capture buffer was full.
    pub packets_dropped: u64,
    /// Dropped by the interface or its driver.
    pub packets_interface_dropped: u64,
}

impl CaptureStatistics {
    /// Fraction of packets lost to the capture buffer, `0.0` with no traffic.
    pub fn drop_ratio(&self) -> f64 {
        let seen = self.packets_received + self.packets_dropped;
        if seen == 0 {
            return 0.0;
        }
        self.packets_dropped as f64 / seen as f64
    }
}

impl From<pcap::Stat> for CaptureStatistics {
    fn from(stat: pcap::Stat) -> Self {
        Self {
            packets_received: u64::from(stat.received),
            packets_dropped: u64::from(stat.dropped),
            packets_interface_dropped: u64::from(stat.if_dropped),
        }
    }
}

/// Whether devices of this kind can report drop statistics.
pub fn supports_statistics(kind: SourceKind) -> bool {
    matches!(kind, SourceKind::Live)
}
