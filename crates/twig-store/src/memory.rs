//! Object store held entirely in memory.

use std::collections::HashMap;
use std::sync::RwLock;

use twig_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Object store backed by a `HashMap`, for tests and embedding.
///
/// A batch is checked in full before anything is inserted and then inserted
/// under a single write lock, so a concurrent reader sees either none or all
/// of a session flush.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

/// The id `object` is stored under; the null id is reserved.
fn storage_id(object: &StoredObject) -> StoreResult<ObjectId> {
    let id = object.compute_id();
    if id.is_null() {
        return Err(StoreError::NullObjectId);
    }
    Ok(id)
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Every stored id, sorted.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Sorted ids of the stored objects of one kind.
    pub fn ids_of_kind(&self, kind: ObjectKind) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map
            .iter()
            .filter(|(_, object)| object.kind == kind)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = storage_id(object)?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        let ids = objects
            .iter()
            .map(storage_id)
            .collect::<StoreResult<Vec<_>>>()?;
        let mut map = self.objects.write().expect("lock poisoned");
        for (id, object) in ids.iter().zip(objects) {
            map.entry(*id).or_insert_with(|| object.clone());
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
