//! Error types for econsync-cache

use std::path::PathBuf;
use thiserror::Error;

/// Cache error type
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while reading or writing the snapshot
    #[error("IO error during {operation} of {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot written by an incompatible version
    #[error("Unsupported cache version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Requested format is not compiled in
    #[error("Cache format unavailable: {0}")]
    FormatUnavailable(String),
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
