//! Error types for pebrust-core

use crate::endpoint::Endpoint;

/// Result type alias for pebrust operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Payload does not fit the 16-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
    
    /// Unknown endpoint id
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(u16),
    
    /// Payload could not be decoded for its endpoint
    #[error("Malformed {endpoint} message: {reason}")]
    Malformed {
        endpoint: Endpoint,
        reason: String,
    },
    
    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
    
    /// Value type error
    #[error("Type error: {0}")]
    Types(#[from] pebrust_types::Error),
    
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the error only affects a single inbound message
    ///
    /// Such messages are logged and skipped; the stream stays usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::UnknownEndpoint(_)
                | Self::Types(_)
        )
    }
}
