//! Error types for econsync-hub

use crate::ConsumerId;
use thiserror::Error;

/// Result type for econsync-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in econsync-hub
///
/// Connectivity failures never show up here: they move the hub to
/// `Offline` instead. What remains are protocol, resolution and
/// configuration defects.
#[derive(Debug, Error)]
pub enum Error {
    /// Core error (resolution, formula parsing, manifests)
    #[error("core error: {0}")]
    Core(#[from] econsync_core::Error),

    /// Cache error
    #[error("cache error: {0}")]
    Cache(#[from] econsync_cache::Error),

    /// Malformed backend payload
    #[error("netcode error: {0}")]
    Netcode(#[from] econsync_netcode::Error),

    /// Backend returned an element id that was never requested
    #[error("backend returned element {0}, which no coordinate declares")]
    UnknownElement(i64),

    /// A resolved value was written again outside of a live update
    #[error("value for {0} is already resolved; only live updates may overwrite it")]
    AlreadyResolved(String),

    /// Element carries neither usable resources nor a label
    #[error("element {id} is invalid: {reason}")]
    InvalidElement { id: i64, reason: String },

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No consumer enrolled under this id
    #[error("no consumer enrolled as {0}")]
    UnknownConsumer(ConsumerId),

    /// Operation not allowed in the current sync state
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: crate::SyncState,
    },
}
