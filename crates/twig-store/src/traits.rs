use twig_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Object, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same data always produces the
///   same ID, so writing an existing object is a no-op.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents; decoding happens in
///   [`ObjectStore::load`] on top of the raw accessors.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read multiple objects in a batch.
    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }

    /// Write multiple objects in a batch and return their IDs.
    ///
    /// Default implementation calls `write()` for each object. Backends may
    /// override for better performance (e.g., single fsync).
    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }

    /// Read an object, treating absence as [`StoreError::NotFound`].
    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Read and decode an object.
    fn load(&self, id: &ObjectId) -> StoreResult<Object> {
        Object::from_stored_object(&self.get(id)?)
    }
}
