// lyssna-config/src/device.rs
//! Open-time configuration for capture devices.
//!
//! Every option is optional. An unset option means "use whatever the capture
//! engine picks by default", which is why the values are wrapped in `Option`
//! instead of being given defaults here.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Precision at which packet arrival times are recorded and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampResolution {
    Microsecond,
    Nanosecond,
}

impl TimestampResolution {
    /// Number of fractional-second digits used when rendering a timestamp.
    pub const fn fraction_digits(self) -> usize {
        match self {
            TimestampResolution::Microsecond => 6,
            TimestampResolution::Nanosecond => 9,
        }
    }

    /// Number of fraction units in one second.
    pub const fn units_per_second(self) -> u32 {
        match self {
            TimestampResolution::Microsecond => 1_000_000,
            TimestampResolution::Nanosecond => 1_000_000_000,
        }
    }
}

impl fmt::Display for TimestampResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampResolution::Microsecond => f.write_str("microsecond"),
            TimestampResolution::Nanosecond => f.write_str("nanosecond"),
        }
    }
}

/// Options recognised when a capture device is opened.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Requested timestamp resolution. The device reports what it actually got.
    #[serde(default)]
    pub timestamp_resolution: Option<TimestampResolution>,

    /// Maximum number of bytes captured per packet.
    #[serde(default)]
    #[validate(range(min = 1, max = 262144))]
    pub snapshot_length: Option<i32>,

    /// Receive traffic not addressed to the local interface.
    #[serde(default)]
    pub promiscuous: Option<bool>,

    /// Read timeout for live retrieval, in milliseconds.
    #[serde(default)]
    #[validate(range(max = 60000))]
    pub read_timeout_ms: Option<u32>,

    /// Kernel capture buffer size in bytes.
    #[serde(default, deserialize_with = "deserialize_optional_size")]
    #[validate(range(min = 4096, max = 1073741824))]
    pub buffer_size: Option<usize>,
}

impl DeviceConfig {
    pub fn with_timestamp_resolution(mut self, resolution: TimestampResolution) -> Self {
        self.timestamp_resolution = Some(resolution);
        self
    }

    pub fn with_snapshot_length(mut self, snapshot_length: i32) -> Self {
        self.snapshot_length = Some(snapshot_length);
        self
    }

    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = Some(promiscuous);
        self
    }

    /// Sets the read timeout. Sub-millisecond precision is truncated.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = Some(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// True if any option that only makes sense for live interfaces is set.
    pub fn has_live_only_options(&self) -> bool {
        self.snapshot_length.is_some()
            || self.promiscuous.is_some()
            || self.read_timeout_ms.is_some()
            || self.buffer_size.is_some()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Accepts human-friendly sizes (e.g. "2MiB") as well as plain byte counts.
fn deserialize_optional_size<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SizeValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SizeValue::Num(n)) => Ok(Some(n)),
        Some(SizeValue::Str(s)) => parse_size(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (num_part, unit_part) = s.split_at(split);
    let number: f64 = num_part
        .parse()
        .map_err(|e| format!("invalid size '{}': {}", s, e))?;
    let multiplier = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" | "kib" => 1024.0,
        "mb" | "mib" => 1024.0 * 1024.0,
        "gb" | "gib" => 1024.0 * 1024.0 * 1024.0,
        other => return Err(format!("unknown size unit '{}'", other)),
    };
    Ok((number * multiplier) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        DeviceConfig::default()
            .validate()
            .expect("an empty configuration takes engine defaults");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let config = DeviceConfig::default().with_snapshot_length(0);
        assert!(config.validate().is_err());

        let config = DeviceConfig::default().with_buffer_size(16);
        assert!(config.validate().is_err());

        let config = DeviceConfig::default().with_read_timeout(Duration::from_secs(120));
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_human_sizes() {
        let config: DeviceConfig = serde_yaml::from_str("buffer_size: 2MiB").unwrap();
        assert_eq!(config.buffer_size, Some(2 * 1024 * 1024));

        let config: DeviceConfig = serde_yaml::from_str("buffer_size: 8192").unwrap();
        assert_eq!(config.buffer_size, Some(8192));

        assert!(serde_yaml::from_str::<DeviceConfig>("buffer_size: 3 parsecs").is_err());
    }

    #[test]
    fn resolution_digits() {
        assert_eq!(TimestampResolution::Microsecond.fraction_digits(), 6);
        assert_eq!(TimestampResolution::Nanosecond.fraction_digits(), 9);
        let parsed: TimestampResolution = serde_yaml::from_str("nanosecond").unwrap();
        assert_eq!(parsed, TimestampResolution::Nanosecond);
    }

    #[test]
    fn live_only_options_are_detected() {
        assert!(!DeviceConfig::default()
            .with_timestamp_resolution(TimestampResolution::Nanosecond)
            .has_live_only_options());
        assert!(DeviceConfig::default()
            .with_promiscuous(true)
            .has_live_only_options());
    }
}
