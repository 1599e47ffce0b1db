//! On-disk repository layout: object and ref stores, config and keys under
//! one directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use twig_crypto::{Keyring, SigningKey};
use twig_refs::{validate_ref_name, RefStore, HEAD, HEADS_PREFIX, TAGS_PREFIX};
use twig_store::{FsObjectStore, ObjectStore};
use twig_tree::{CommitConfig, IdentityConfig};
use twig_types::ObjectId;

pub const CONFIG_FILE: &str = "config.toml";
pub const KEYS_DIR: &str = "keys";
const KEY_EXTENSION: &str = "key";

pub struct Repo {
    pub root: PathBuf,
    pub objects: Arc<FsObjectStore>,
    pub refs: Arc<dyn RefStore>,
    /// File config with `TWIG_*` environment overrides applied.
    pub config: CommitConfig,
}

impl Repo {
    /// Create a repository whose `HEAD` points at the unborn `branch`.
    pub fn init(root: &Path, branch: &str, user: IdentityConfig) -> anyhow::Result<Self> {
        if root.join(HEAD).exists() {
            bail!("repository already exists at {}", root.display());
        }
        let objects = FsObjectStore::open(root)?;
        let refs = twig_refs::FsRefStore::open(root)?;
        refs.set_symbolic(HEAD, &format!("{HEADS_PREFIX}{branch}"))?;
        fs::create_dir_all(root.join(KEYS_DIR))?;

        let config = CommitConfig {
            user,
            ..CommitConfig::default()
        };
        fs::write(root.join(CONFIG_FILE), config.to_toml_string()?)?;
        Ok(Self {
            root: root.to_path_buf(),
            objects: Arc::new(objects),
            refs: Arc::new(refs),
            config: config.with_env_overrides(),
        })
    }

    pub fn open(root: &Path) -> anyhow::Result<Self> {
        if !root.join(HEAD).is_file() {
            bail!("not a twig repository: {}", root.display());
        }
        let config = CommitConfig::load_or_default(root.join(CONFIG_FILE))?.with_env_overrides();
        Ok(Self {
            root: root.to_path_buf(),
            objects: Arc::new(FsObjectStore::open(root)?),
            refs: Arc::new(twig_refs::FsRefStore::open(root)?),
            config,
        })
    }

    fn key_path(&self, id: &str) -> anyhow::Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            bail!("invalid key id: {id:?}");
        }
        Ok(self
            .root
            .join(KEYS_DIR)
            .join(format!("{id}.{KEY_EXTENSION}")))
    }

    /// Write `key` as hex to `keys/<id>.key`. Existing keys are never
    /// overwritten.
    pub fn save_key(&self, id: &str, key: &SigningKey) -> anyhow::Result<PathBuf> {
        let path = self.key_path(id)?;
        if path.exists() {
            bail!("key {id} already exists");
        }
        fs::create_dir_all(self.root.join(KEYS_DIR))?;
        fs::write(&path, key.to_hex())?;
        Ok(path)
    }

    /// Every key under `keys/`, with the configured signing key as default.
    pub fn keyring(&self) -> anyhow::Result<Keyring> {
        let mut keyring = Keyring::new();
        let dir = self.root.join(KEYS_DIR);
        if dir.is_dir() {
            let mut paths = fs::read_dir(&dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?;
            paths.sort();
            for path in paths {
                if path.extension().and_then(|e| e.to_str()) != Some(KEY_EXTENSION) {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let hex = fs::read_to_string(&path)?;
                let key = SigningKey::from_hex(hex.trim())
                    .with_context(|| format!("reading key {}", path.display()))?;
                keyring.insert(id, key);
            }
        }
        if let Some(id) = &self.config.commit.signing_key {
            keyring.set_default(id)?;
        }
        Ok(keyring)
    }

    /// Record `id` as `commit.signing_key` in the config file.
    pub fn set_default_key(&mut self, id: &str) -> anyhow::Result<()> {
        let path = self.root.join(CONFIG_FILE);
        let mut file_config = CommitConfig::load_or_default(&path)?;
        file_config.commit.signing_key = Some(id.to_string());
        fs::write(&path, file_config.to_toml_string()?)?;
        self.config.commit.signing_key = Some(id.to_string());
        Ok(())
    }

    /// Resolve a revision to a commit id: a full hex id naming a stored
    /// object, else a ref name as given, under `refs/heads/` or under
    /// `refs/tags/`.
    pub fn resolve_commit(&self, rev: &str) -> anyhow::Result<ObjectId> {
        if let Ok(id) = ObjectId::from_hex(rev) {
            if self.objects.exists(&id)? {
                return Ok(id);
            }
        }
        for candidate in [
            rev.to_string(),
            format!("{HEADS_PREFIX}{rev}"),
            format!("{TAGS_PREFIX}{rev}"),
        ] {
            if validate_ref_name(&candidate).is_err() {
                continue;
            }
            if let Some(id) = self.refs.resolve(&candidate)? {
                return Ok(id);
            }
        }
        bail!("{rev} does not name a commit")
    }
}
