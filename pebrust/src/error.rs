//! High-level error types

use std::fmt;
use std::time::Duration;

use pebrust_core::ObjectType;

use crate::install::InstallState;

pub type Result<T> = std::result::Result<T, Error>;

/// Protocol step an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Negotiation,
    MetadataInsert,
    AppFetch,
    PutBytesInit(ObjectType),
    PutBytesPut(ObjectType),
    PutBytesCommit(ObjectType),
    PutBytesInstall(ObjectType),
    Screenshot,
    DataLogging,
    Ping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negotiation => f.write_str("version negotiation"),
            Self::MetadataInsert => f.write_str("app metadata insert"),
            Self::AppFetch => f.write_str("app fetch"),
            Self::PutBytesInit(object) => write!(f, "PutBytes init ({})", object),
            Self::PutBytesPut(object) => write!(f, "PutBytes put ({})", object),
            Self::PutBytesCommit(object) => write!(f, "PutBytes commit ({})", object),
            Self::PutBytesInstall(object) => write!(f, "PutBytes install ({})", object),
            Self::Screenshot => f.write_str("screenshot"),
            Self::DataLogging => f.write_str("data logging"),
            Self::Ping => f.write_str("ping"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] pebrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] pebrust_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] pebrust_types::Error),

    /// The watch did not answer in time
    #[error("No response during {phase} after {after:?}")]
    Timeout { phase: Phase, after: Duration },

    /// The watch answered with an explicit failure
    #[error("Rejected during {phase}: {reason}")]
    Rejected { phase: Phase, reason: String },

    /// An install step failed; `state` is how far the install got
    #[error("Install failed while {state}: {source}")]
    Install {
        state: InstallState,
        #[source]
        source: Box<Error>,
    },

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn rejected(phase: Phase, reason: impl Into<String>) -> Self {
        Self::Rejected {
            phase,
            reason: reason.into(),
        }
    }

    /// The failure itself, without install context
    fn root(&self) -> &Self {
        match self {
            Self::Install { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the watch failed to respond
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Timeout { .. })
    }

    /// Check if the watch explicitly refused
    pub fn is_rejection(&self) -> bool {
        matches!(self.root(), Self::Rejected { .. })
    }

    /// Phase of a protocol failure
    pub fn phase(&self) -> Option<Phase> {
        match self.root() {
            Self::Timeout { phase, .. } | Self::Rejected { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Install step that was running when an install failed
    pub fn install_state(&self) -> Option<InstallState> {
        match self {
            Self::Install { state, .. } => Some(*state),
            _ => None,
        }
    }

    /// Check if the emulator closed the connection
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self.root(),
            Self::Transport(pebrust_transport::Error::ConnectionClosed)
        )
    }
}
