//! Transactional, copy-on-write editing of twig trees.
//!
//! A session opens the tree behind a ref, applies any number of path edits,
//! and publishes the result as one commit. Edits never modify a tree in
//! place: each one rebuilds the trees along the edited path and leaves every
//! other sub-tree (and its id) shared with the previous snapshot.
//!
//! # Key Types
//!
//! - [`TreeReader`] -- read-only snapshot opened from a treeish
//! - [`TreeRead`] -- path navigation shared by readers and writers
//! - [`TreeWriter`] -- editing session with staged objects and commit
//! - [`StagingTable`] -- reference-counted objects not yet persisted
//! - [`CommitOptions`] -- message, identities, timestamps, signing
//! - [`CommitConfig`] / [`IdentitySource`] -- ambient commit defaults
//!
//! # Publishing
//!
//! [`TreeWriter::commit`] writes every staged object, then moves the ref
//! with a compare-and-swap against the head observed at the last reset. A
//! concurrent writer that got there first turns the commit into
//! [`TreeError::CommitConflict`]; there is no retry.

pub mod commit;
pub mod config;
pub mod error;
pub mod path;
pub mod reader;
pub mod staging;
pub mod writer;

pub use commit::{reflog_message, CommitOptions, COMMIT_ENCODING};
pub use config::{CommitConfig, IdentityConfig, IdentitySource, SigningConfig};
pub use error::{TreeError, TreeResult};
pub use reader::{resolve_treeish, TreeRead, TreeReader};
pub use staging::{StagedObject, StagingTable};
pub use writer::{SessionState, TreeWriter};
