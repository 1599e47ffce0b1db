//! Git-style loose refs on the local filesystem.
//!
//! Layout under the store root:
//! ```text
//! HEAD                  "ref: refs/heads/main\n"
//! refs/heads/main       "<64 hex>\n"
//! logs/refs/heads/main  one JSON-encoded RefLogEntry per line
//! ```
//! Updates take `<ref>.lock` with exclusive-create semantics, check the
//! current value, write the new value into the lock file and rename it over
//! the ref. The reflog line is appended while the lock is held, before the
//! rename, so an update that returns an error never moved the ref. A second
//! writer that finds the lock present fails with
//! [`RefError::Locked`] instead of waiting.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use twig_types::ObjectId;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::{validate_ref_name, HEAD};
use crate::traits::RefStore;
use crate::types::{Ref, RefLogEntry, RefUpdate};

const SYMREF_PREFIX: &str = "ref: ";
const LOCK_SUFFIX: &str = ".lock";

/// Ref store backed by one file per ref.
#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

/// Exclusive lock on one ref, released (deleted) on drop unless committed.
struct RefLock {
    lock_path: PathBuf,
    file: File,
    committed: bool,
}

impl RefLock {
    fn acquire(name: &str, ref_path: &Path) -> Result<Self> {
        let mut lock_path = ref_path.as_os_str().to_owned();
        lock_path.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_path);
        if let Some(dir) = lock_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RefError::Locked {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            lock_path,
            file,
            committed: false,
        })
    }

    /// Write `contents` and move the lock file over `ref_path`.
    fn commit(mut self, ref_path: &Path, contents: &str) -> Result<()> {
        self.file.write_all(contents.as_bytes())?;
        self.file.sync_all()?;
        fs::rename(&self.lock_path, ref_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for RefLock {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.lock_path) {
                warn!(path = %self.lock_path.display(), error = %e, "failed to remove ref lock");
            }
        }
    }
}

impl FsRefStore {
    /// Open (creating if needed) a ref store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("refs").join("heads"))?;
        fs::create_dir_all(root.join("refs").join("tags"))?;
        info!(root = %root.display(), "opened ref store");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    fn log_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.root.join("logs"), |p, seg| p.join(seg))
    }

    fn parse(name: &str, contents: &str) -> Result<Ref> {
        let line = contents.trim_end_matches('\n');
        if let Some(target) = line.strip_prefix(SYMREF_PREFIX) {
            return Ok(Ref::Symbolic(target.to_string()));
        }
        ObjectId::from_hex(line)
            .map(Ref::Direct)
            .map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn append_log(&self, name: &str, entry: &RefLogEntry) -> Result<()> {
        let path = self.log_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut line =
            serde_json::to_string(entry).map_err(|e| RefError::Serialization(e.to_string()))?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        match fs::read_to_string(self.ref_path(name)) {
            Ok(contents) => Self::parse(name, &contents).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
        update: &RefUpdate,
    ) -> Result<bool> {
        validate_ref_name(name)?;
        let target = self.resolve_target(name)?;
        validate_ref_name(&target)?;

        let ref_path = self.ref_path(&target);
        let lock = RefLock::acquire(&target, &ref_path)?;

        let current = self.read_ref(&target)?.and_then(|r| r.target_id());
        if current != expected {
            debug!(%target, ?expected, ?current, "compare-and-set rejected");
            return Ok(false);
        }

        // Logged under the lock and before the rename: a failed append
        // leaves the ref where it was.
        self.append_log(&target, &RefLogEntry::from_update(current, new, update))?;
        lock.commit(&ref_path, &format!("{}\n", new.to_hex()))?;
        debug!(%target, %new, "ref updated");
        Ok(true)
    }

    fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let ref_path = self.ref_path(name);
        let lock = RefLock::acquire(name, &ref_path)?;
        lock.commit(&ref_path, &format!("{SYMREF_PREFIX}{target}\n"))
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        validate_ref_name(name)?;
        let ref_path = self.ref_path(name);
        let _lock = RefLock::acquire(name, &ref_path)?;
        let existed = match fs::remove_file(&ref_path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(self.log_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(existed)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let mut result = Vec::new();
        if HEAD.starts_with(prefix) {
            if let Some(head) = self.read_ref(HEAD)? {
                result.push((HEAD.to_string(), head));
            }
        }

        for entry in WalkDir::new(self.root.join("refs")) {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if name.ends_with(LOCK_SUFFIX) || !name.starts_with(prefix) {
                continue;
            }
            if let Some(r) = self.read_ref(&name)? {
                result.push((name, r));
            }
        }

        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn reflog(&self, name: &str) -> Result<Vec<RefLogEntry>> {
        validate_ref_name(name)?;
        let file = match File::open(self.log_path(name)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: format!("reflog: {e}"),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
