//! Capture sources and the capability differences between them.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::handle::HandleBridge;

/// Broad category of a capture source. Capabilities hang off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A live network interface.
    Live,
    /// A capture file opened by path.
    Replay,
    /// Capture data read through a caller-supplied OS handle.
    HandleReplay,
}

impl SourceKind {
    pub fn is_replay(self) -> bool {
        !matches!(self, SourceKind::Live)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Live => f.write_str("live"),
            SourceKind::Replay => f.write_str("replay"),
            SourceKind::HandleReplay => f.write_str("handle-replay"),
        }
    }
}

/// Where a device reads from. Each variant carries only what it needs.
#[derive(Debug)]
pub(crate) enum Source {
    Live { interface: String },
    File { path: PathBuf },
    Handle(HandleBridge),
}

impl Source {
    pub(crate) fn kind(&self) -> SourceKind {
        match self {
            Source::Live { .. } => SourceKind::Live,
            Source::File { .. } => SourceKind::Replay,
            Source::Handle(_) => SourceKind::HandleReplay,
        }
    }
}
