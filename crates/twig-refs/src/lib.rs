//! Reference management for twig.
//!
//! Refs are the named, mutable entry points into the commit graph. Every
//! other object is immutable; refs are the only thing that moves, and they
//! only move through [`RefStore::compare_and_set`].
//!
//! # Architecture
//!
//! - **Direct refs** (`refs/heads/*`, `refs/tags/*`) hold an object id.
//! - **Symbolic refs** (usually `HEAD`) name another ref. Reads and
//!   compare-and-swap updates follow them, so committing "on HEAD" advances
//!   the branch HEAD points at, even when that branch does not exist yet.
//! - **Reflogs** record every successful update of a direct ref.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: [`Ref`], [`RefUpdate`], [`RefLogEntry`]
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Ref name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`] for tests
//! - [`fs`]: [`FsRefStore`], git-style loose ref files with lock-file CAS

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_name, HEAD, HEADS_PREFIX, TAGS_PREFIX};
pub use traits::{RefStore, MAX_SYMBOLIC_DEPTH};
pub use types::{Ref, RefLogEntry, RefUpdate};
