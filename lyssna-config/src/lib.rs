//! # Lyssna Configuration System
//!
//! Hierarchical configuration for capture devices and the surrounding
//! telemetry.
//!
//! ## Features
//! - **Open-time options**: `DeviceConfig`, validated before a device opens
//! - **Sources**: live interfaces and capture files described declaratively
//! - **Layering**: defaults, YAML files, then `LYSSNA_*` environment variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod device;
mod error;
mod source;
mod telemetry;
mod validation;

pub use device::{DeviceConfig, TimestampResolution};
pub use error::ConfigError;
pub use source::SourceConfig;
pub use telemetry::TelemetryConfig;
pub use validation::{validate_filter_expression, validate_interface};

const BASE_CONFIG_FILE: &str = "config/lyssna.yaml";
const ENV_PREFIX: &str = "LYSSNA_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq, Eq)]
pub struct LyssnaConfig {
    /// Options applied when the capture device is opened.
    #[serde(default)]
    #[validate(nested)]
    pub device: DeviceConfig,

    /// The capture source and its optional filter.
    #[serde(default)]
    #[validate(custom(function = source::validate_source))]
    pub source: SourceConfig,

    /// Logging and metrics.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl LyssnaConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/lyssna.yaml`, if present
    /// 3. `config/<LYSSNA_ENV>.yaml`, if present (`LYSSNA_ENV` defaults to `production`)
    /// 4. `LYSSNA_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(LyssnaConfig::default()));

        if Path::new(BASE_CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_CONFIG_FILE));
        }

        let env = std::env::var("LYSSNA_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific YAML file plus environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract(
            Figment::from(Serialized::defaults(LyssnaConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
