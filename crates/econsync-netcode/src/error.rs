//! Error types for econsync-netcode

use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// Connection is closed or was never opened
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload did not have the expected shape
    #[error("Malformed '{event}' payload: {reason}")]
    MalformedPayload { event: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn malformed(event: &str, reason: impl Into<String>) -> Self {
        Error::MalformedPayload {
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
