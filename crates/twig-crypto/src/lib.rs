//! Cryptographic primitives for twig.
//!
//! Provides domain-separated BLAKE3 hashing for content-addressed objects and
//! Ed25519 signing for commits. Signing is exposed through the [`Signer`]
//! trait so callers can plug in their own key management; [`Keyring`] is the
//! bundled implementation.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{Keyring, Signature, SignatureError, Signer, SigningKey, VerifyingKey};
