use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// An author or committer identity is malformed.
    #[error("invalid identity {identity:?}: {reason}")]
    InvalidIdentity { identity: String, reason: String },

    #[error("invalid timezone offset: {0}")]
    InvalidTimezone(String),
}
