use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey(#[serde(with = "verifying_key_serde")] ed25519_dalek::VerifyingKey);

/// Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_serde")] ed25519_dalek::Signature);

/// Produces signatures over commit payloads.
///
/// `key_id` selects a key; `None` means the signer's default key.
pub trait Signer: Send + Sync {
    /// Sign `payload` with the selected key.
    fn sign(&self, payload: &[u8], key_id: Option<&str>) -> Result<Signature, SignatureError>;

    /// The public half of the selected key, for embedding next to signatures.
    fn verifying_key(&self, key_id: Option<&str>) -> Result<VerifyingKey, SignatureError>;
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim()).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    /// Hex-encoded secret, for key files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer as _;
        Signature(self.0.sign(message))
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from a raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Hex-encoded public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl Signature {
    /// Hex-encoded signature bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

/// A named collection of signing keys.
///
/// The first key inserted becomes the default unless another one is chosen
/// with [`Keyring::set_default`].
#[derive(Default)]
pub struct Keyring {
    keys: BTreeMap<String, SigningKey>,
    default: Option<String>,
}

impl Keyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key under `id`, replacing any key with the same id.
    pub fn insert(&mut self, id: impl Into<String>, key: SigningKey) {
        let id = id.into();
        if self.default.is_none() {
            self.default = Some(id.clone());
        }
        self.keys.insert(id, key);
    }

    /// Choose the key used when no key id is given.
    pub fn set_default(&mut self, id: &str) -> Result<(), SignatureError> {
        if !self.keys.contains_key(id) {
            return Err(SignatureError::UnknownKey(id.to_string()));
        }
        self.default = Some(id.to_string());
        Ok(())
    }

    /// Ids of all keys, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the keyring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn select(&self, key_id: Option<&str>) -> Result<&SigningKey, SignatureError> {
        let id = match key_id {
            Some(id) => id,
            None => self.default.as_deref().ok_or(SignatureError::NoDefaultKey)?,
        };
        self.keys
            .get(id)
            .ok_or_else(|| SignatureError::UnknownKey(id.to_string()))
    }
}

impl Signer for Keyring {
    fn sign(&self, payload: &[u8], key_id: Option<&str>) -> Result<Signature, SignatureError> {
        Ok(self.select(key_id)?.sign(payload))
    }

    fn verifying_key(&self, key_id: Option<&str>) -> Result<VerifyingKey, SignatureError> {
        Ok(self.select(key_id)?.verifying_key())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("keys", &self.key_ids())
            .field("default", &self.default)
            .finish()
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("unknown signing key: {0}")]
    UnknownKey(String),
    #[error("no default signing key configured")]
    NoDefaultKey,
}

mod signature_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sig: &ed25519_dalek::Signature, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(sig.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::Signature, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64-byte signature"))?;
        Ok(ed25519_dalek::Signature::from_bytes(&arr))
    }
}

mod verifying_key_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &ed25519_dalek::VerifyingKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(key.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::VerifyingKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte public key"))?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr).map_err(serde::de::Error::custom)
    }
}
