//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name violates the naming rules.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// Following symbolic refs from `name` did not reach a direct ref.
    #[error("symbolic ref loop or chain too deep at {name}")]
    SymbolicLoop { name: String },

    /// Another writer holds the lock for this ref.
    #[error("ref is locked: {name}")]
    Locked { name: String },

    /// The stored ref could not be parsed.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
