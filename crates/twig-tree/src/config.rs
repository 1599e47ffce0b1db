//! Commit defaults: identities and signing preferences.
//!
//! ```toml
//! [user]
//! name = "Ada Lovelace"
//! email = "ada@example.com"
//!
//! [committer]            # overrides [user] for the committer only
//! email = "ci@example.com"
//!
//! [commit]
//! sign = true
//! signing_key = "release"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use twig_types::{Identity, IdentityKind, TypeError};

use crate::error::{TreeError, TreeResult};

/// Name used when neither the caller nor the configuration supplies one.
pub const FALLBACK_NAME: &str = "twig";
/// Email used when neither the caller nor the configuration supplies one.
pub const FALLBACK_EMAIL: &str = "twig@localhost";

/// Source of ambient commit defaults, consulted only for values the caller
/// left unset.
pub trait IdentitySource: Send + Sync {
    /// Default identity for the given role.
    fn default_identity(&self, kind: IdentityKind) -> Result<Identity, TypeError>;

    /// Whether commits are signed when the caller does not say.
    fn default_signing_requested(&self) -> bool;

    /// Key id used when signing without an explicit key.
    fn default_signing_key(&self) -> Option<String>;
}

/// A `name` / `email` pair; either half may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The `[commit]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub sign: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

/// Repository configuration relevant to committing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    pub user: IdentityConfig,
    pub author: IdentityConfig,
    pub committer: IdentityConfig,
    pub commit: SigningConfig,
}

impl CommitConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> TreeResult<Self> {
        toml::from_str(s).map_err(|e| TreeError::Config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> TreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config(e.to_string()))
    }

    /// Read and parse the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> TreeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TreeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Like [`CommitConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> TreeResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `TWIG_AUTHOR_NAME`, `TWIG_AUTHOR_EMAIL`, `TWIG_COMMITTER_NAME`
    /// and `TWIG_COMMITTER_EMAIL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply the same overrides as [`CommitConfig::with_env_overrides`],
    /// reading values through `lookup`.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let targets = [
            ("TWIG_AUTHOR_NAME", &mut self.author.name),
            ("TWIG_AUTHOR_EMAIL", &mut self.author.email),
            ("TWIG_COMMITTER_NAME", &mut self.committer.name),
            ("TWIG_COMMITTER_EMAIL", &mut self.committer.email),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }
        self
    }

    fn section(&self, kind: IdentityKind) -> &IdentityConfig {
        match kind {
            IdentityKind::Author => &self.author,
            IdentityKind::Committer => &self.committer,
        }
    }
}

impl IdentitySource for CommitConfig {
    fn default_identity(&self, kind: IdentityKind) -> Result<Identity, TypeError> {
        let section = self.section(kind);
        let name = section
            .name
            .as_deref()
            .or(self.user.name.as_deref())
            .unwrap_or(FALLBACK_NAME);
        let email = section
            .email
            .as_deref()
            .or(self.user.email.as_deref())
            .unwrap_or(FALLBACK_EMAIL);
        Identity::new(name, email)
    }

    fn default_signing_requested(&self) -> bool {
        self.commit.sign
    }

    fn default_signing_key(&self) -> Option<String> {
        self.commit.signing_key.clone()
    }
}
