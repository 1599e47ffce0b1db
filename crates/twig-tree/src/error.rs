//! Error types for tree sessions.

use twig_refs::RefError;
use twig_store::StoreError;
use twig_types::{IdentityKind, TypeError};

/// Errors that can occur while reading, editing or committing a tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// No entry exists at the path.
    #[error("path not found: {0}")]
    NotFound(String),

    /// A path segment that must be a directory names something else.
    #[error("not a tree: {0}")]
    NotATree(String),

    /// A treeish could not be dereferenced to a tree.
    #[error("cannot resolve {0:?} to a tree")]
    Resolution(String),

    /// The path is malformed (e.g. `a//b`) or names the root where an entry
    /// is required.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// The author or committer identity, given or defaulted, is malformed.
    #[error("invalid {0} identity: {1}")]
    InvalidIdentity(IdentityKind, #[source] TypeError),

    /// The ref moved between the session's reset and its commit.
    #[error("{ref_name} changed during commit")]
    CommitConflict { ref_name: String },

    /// Signing was requested and could not be performed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Object store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Ref store failure.
    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

/// Convenience alias for tree session results.
pub type TreeResult<T> = Result<T, TreeError>;
