// lyssna-config/src/source.rs
//! Where packets come from.
//!
//! Handle-backed sources are deliberately absent: an OS handle only exists at
//! runtime and cannot be described in a configuration file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::error::ConfigError;

use crate::validation;

/// Capture source description, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A live network interface.
    Live {
        interface: String,
        #[serde(default)]
        filter: Option<String>,
    },
    /// A saved capture file replayed from disk.
    File {
        path: PathBuf,
        #[serde(default)]
        filter: Option<String>,
    },
}

impl SourceConfig {
    pub fn filter(&self) -> Option<&str> {
        match self {
            SourceConfig::Live { filter, .. } | SourceConfig::File { filter, .. } => {
                filter.as_deref()
            }
        }
    }

    /// Validates a source outside of a full [`crate::LyssnaConfig`].
    pub fn check(&self) -> Result<(), ConfigError> {
        validate_source(self).map_err(|error| {
            let mut errors = ValidationErrors::new();
            errors.add("source", error);
            ConfigError::Validation(errors)
        })
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Live {
            interface: "eth0".into(),
            filter: None,
        }
    }
}

/// Field-level validation hook used by `#[validate(custom(...))]`.
pub fn validate_source(source: &SourceConfig) -> Result<(), ValidationError> {
    match source {
        SourceConfig::Live { interface, .. } => validation::validate_interface(interface)?,
        SourceConfig::File { path, .. } => {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::new("empty_capture_path"));
            }
        }
    }
    if let Some(filter) = source.filter() {
        validation::validate_filter_expression(filter)?;
    }
    Ok(())
}
