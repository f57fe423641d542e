//! Error types for econsync-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid formula '{expression}': {reason}")]
    Formula { expression: String, reason: String },

    #[error("Coordinate not declared by any manifest: {0}")]
    CoordinateNotDeclared(String),

    #[error("Coordinate has not been initialized: {0}")]
    NotInitialized(String),

    #[error("No value could be resolved for {0}")]
    Unresolved(String),

    #[error("No value for {0} while offline in strict mode")]
    StrictOffline(String),

    #[error("No active value for {0}")]
    NoActiveValue(String),

    #[error("No value selected and no default available for {0}")]
    NoValueAndNoDefault(String),

    #[error("Slot collision in binder {0}")]
    SlotCollision(String),

    #[error("Missing remote id for {0}")]
    MissingRemoteId(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),
}

impl Error {
    pub(crate) fn formula(expression: &str, reason: impl Into<String>) -> Self {
        Error::Formula {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
