//! Content-addressed object storage for twig.
//!
//! Every piece of repository data (file contents, directory listings, commits)
//! is an immutable object identified by the BLAKE3 hash of its canonical
//! encoding, domain-separated by object kind.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (file contents, arbitrary data)
//! - [`Tree`] -- sorted directory listing mapping names to object references
//! - [`Commit`] -- a revision: root tree, parents, authorship, message
//!
//! [`Object`] is the polymorphic view over all three.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- one file per object under `objects/`
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: writing an existing object is a no-op.
//! 3. There is no ordering dependency between writes; a tree may be stored
//!    before the objects it references.
//! 4. The store never interprets object contents beyond the kind tag.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{
    Blob, Commit, CommitSignature, EntryMode, Object, ObjectKind, SignatureStatus, StoredObject,
    Tree, TreeEntry,
};
pub use traits::ObjectStore;
