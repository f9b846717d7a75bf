//! Filter compilation and installation.

use serde::Serialize;
use tracing::debug;

use crate::engine::Engine;
use crate::error::CaptureError;
use crate::packet::LinkType;

/// An installed filter, scoped to the link type it was compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterProgram {
    expression: String,
    link_type: LinkType,
}

impl FilterProgram {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }
}

/// Compiles `expression` for the engine's link type and installs it.
///
/// Installation happens only after a successful compile, so a failing
/// expression leaves the current program matching.
pub(crate) fn install(engine: &mut Engine, expression: &str) -> Result<FilterProgram, CaptureError> {
    engine
        .install_filter(expression)
        .map_err(|err| CaptureError::FilterCompile {
            expression: expression.to_owned(),
            reason: err.to_string(),
        })?;

    let program = FilterProgram {
        expression: expression.to_owned(),
        link_type: engine.link_type(),
    };
    debug!(expression, link_type = %program.link_type, "filter installed");
    Ok(program)
}

/// Installs the match-everything program.
pub(crate) fn clear(engine: &mut Engine) -> Result<(), CaptureError> {
    engine
        .install_filter("")
        .map_err(|err| CaptureError::FilterCompile {
            expression: String::new(),
            reason: err.to_string(),
        })?;
    debug!("filter cleared");
    Ok(())
}
