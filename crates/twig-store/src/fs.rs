//! Loose-object store on the local filesystem.
//!
//! Layout under the store root:
//! ```text
//! objects/
//!   ab/                 first two hex digits of the id
//!     cdef0123...       remaining 62 hex digits; bincode envelope
//! ```
//! Each file holds an [`Envelope`] (kind tag + encoded data). Files are
//! written to a temporary file in the same directory and renamed into place,
//! so readers never observe a partially written object.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use twig_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

const OBJECTS_DIR: &str = "objects";

/// On-disk record for one object.
#[derive(Serialize, Deserialize)]
struct Envelope {
    kind: ObjectKind,
    data: Vec<u8>,
}

/// Object store backed by one file per object.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        info!(root = %root.display(), "opened object store");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(OBJECTS_DIR).join(&hex[..2]).join(&hex[2..])
    }

    /// Every object id present on disk, sorted.
    pub fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for fanout in fs::read_dir(self.root.join(OBJECTS_DIR))? {
            let fanout = fanout?;
            if !fanout.file_type()?.is_dir() {
                continue;
            }
            let prefix = fanout.file_name().to_string_lossy().into_owned();
            for file in fs::read_dir(fanout.path())? {
                let name = file?.file_name().to_string_lossy().into_owned();
                // Leftover temp files and foreign names are skipped.
                if let Ok(id) = ObjectId::from_hex(&format!("{prefix}{name}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let bytes = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = bincode::deserialize(&bytes).map_err(|e| {
            warn!(%id, error = %e, "undecodable object file");
            StoreError::CorruptObject {
                id: *id,
                reason: e.to_string(),
            }
        })?;
        let object = StoredObject::new(envelope.kind, envelope.data);
        let computed = object.compute_id();
        if computed != *id {
            warn!(%id, %computed, "object content does not match its id");
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Serialization(format!("bad object path for {id}")))?;
        fs::create_dir_all(dir)?;

        let envelope = Envelope {
            kind: object.kind,
            data: object.data.clone(),
        };
        let bytes =
            bincode::serialize(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(%id, kind = %object.kind, size = object.size, "wrote object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}
