//! Reference-counted holding area for objects created during a session.
//!
//! Counts are structural: an object's count is the number of staged trees
//! (plus the session root) whose entries name it. Staging a new tree retains
//! each of its entries; evicting a tree releases them, so a whole sub-graph
//! disappears once nothing staged reaches it. An id that is not staged names
//! an object already in the object store and is never counted.

use std::collections::HashMap;

use twig_store::{Object, StoreResult, StoredObject};
use twig_types::ObjectId;

/// A staged object and the number of staged parents referring to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedObject {
    pub object: Object,
    pub ref_count: usize,
}

/// Map from object id to staged object. Never holds a zero count.
#[derive(Clone, Debug, Default)]
pub struct StagingTable {
    entries: HashMap<ObjectId, StagedObject>,
}

/// Ids named by `object`'s tree entries; other kinds reference nothing.
fn children(object: &Object) -> Vec<ObjectId> {
    match object {
        Object::Tree(tree) => tree.entries().iter().map(|e| e.object_id).collect(),
        _ => Vec::new(),
    }
}

impl StagingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `object` with one reference, or bump its count if it is
    /// already staged.
    pub fn add(&mut self, object: Object) -> StoreResult<ObjectId> {
        let id = object.id()?;
        let mut fresh = HashMap::from([(id, object)]);
        self.retain(id, &mut fresh);
        Ok(id)
    }

    /// Take one reference to `id`.
    ///
    /// A staged id just gains a count. Otherwise, if `fresh` holds the
    /// object it is moved into the table and its own entries are retained
    /// in turn. Ids found in neither place are durable and ignored.
    pub(crate) fn retain(&mut self, id: ObjectId, fresh: &mut HashMap<ObjectId, Object>) {
        if let Some(staged) = self.entries.get_mut(&id) {
            staged.ref_count += 1;
            return;
        }
        let Some(object) = fresh.remove(&id) else {
            return;
        };
        let entries = children(&object);
        self.entries.insert(
            id,
            StagedObject {
                object,
                ref_count: 1,
            },
        );
        for child in entries {
            self.retain(child, fresh);
        }
    }

    /// Drop one reference to `id`. Returns `true` if the object was
    /// evicted; an evicted tree releases each of its entries.
    pub fn release(&mut self, id: &ObjectId) -> bool {
        let Some(staged) = self.entries.get_mut(id) else {
            return false;
        };
        staged.ref_count -= 1;
        if staged.ref_count > 0 {
            return false;
        }
        if let Some(evicted) = self.entries.remove(id) {
            for child in children(&evicted.object) {
                self.release(&child);
            }
        }
        true
    }

    /// The staged object with this id, if any.
    pub fn get(&self, id: &ObjectId) -> Option<&Object> {
        self.entries.get(id).map(|s| &s.object)
    }

    /// Current count for `id` (0 when not staged).
    pub fn ref_count(&self, id: &ObjectId) -> usize {
        self.entries.get(id).map_or(0, |s| s.ref_count)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of all staged objects, sorted.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Encode every staged object for a batch write.
    pub fn to_stored_objects(&self) -> StoreResult<Vec<StoredObject>> {
        self.entries
            .values()
            .map(|s| s.object.to_stored_object())
            .collect()
    }
}
