//! Foundation types for twig.
//!
//! This crate provides the identifier, identity, and time types shared by
//! every other twig crate. It has no knowledge of storage or hashing schemes.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (32-byte BLAKE3 hash)
//! - [`Identity`]: `Name <email>` authorship identity with validation
//! - [`IdentityKind`]: Which role (author or committer) an identity fills
//! - [`Timestamp`]: Seconds since the UNIX epoch plus a timezone offset

pub mod error;
pub mod identity;
pub mod object;
pub mod temporal;

pub use error::TypeError;
pub use identity::{Identity, IdentityKind};
pub use object::ObjectId;
pub use temporal::Timestamp;
