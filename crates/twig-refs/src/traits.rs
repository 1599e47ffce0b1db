//! The [`RefStore`] trait defining the reference storage interface.
//!
//! Any backend (in-memory, filesystem, database) implements this trait to
//! provide named reference management.

use twig_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{HEADS_PREFIX, TAGS_PREFIX};
use crate::types::{Ref, RefLogEntry, RefUpdate};

/// How many symbolic hops are followed before giving up.
pub const MAX_SYMBOLIC_DEPTH: usize = 5;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). Direct refs change
/// only through [`RefStore::compare_and_set`], which is atomic with respect
/// to every other writer of the same store. The namespace follows the git
/// layout:
///
/// - `HEAD`, usually symbolic
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read the raw value stored under `name` without following symbolic refs.
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Atomically set `name` to `new` if its current value is `expected`.
    ///
    /// Symbolic refs are followed, so the update lands on the direct ref at
    /// the end of the chain. `expected = None` means the target must not
    /// exist yet. Returns `Ok(false)` when the current value differs; on
    /// success a [`RefLogEntry`] built from `update` is appended to the
    /// target's reflog.
    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
        update: &RefUpdate,
    ) -> Result<bool>;

    /// Make `name` a symbolic ref pointing at `target`.
    fn set_symbolic(&self, name: &str, target: &str) -> Result<()>;

    /// Delete a ref by name (the ref itself, not its symbolic target).
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted, `Ok(false)` if
    /// it did not exist.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list all refs. Pass `"refs/heads/"` for branches only.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Update history of a direct ref, oldest first.
    fn reflog(&self, name: &str) -> Result<Vec<RefLogEntry>>;

    /// Follow symbolic refs from `name` to the name of the direct ref at the
    /// end of the chain. The final ref may not exist (an unborn branch).
    fn resolve_target(&self, name: &str) -> Result<String> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMBOLIC_DEPTH {
            match self.read_ref(&current)? {
                Some(Ref::Symbolic(target)) => current = target,
                _ => return Ok(current),
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
        })
    }

    /// The object id `name` ultimately points at, following symbolic refs.
    ///
    /// Returns `Ok(None)` for a missing ref or an unborn symbolic target.
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let target = self.resolve_target(name)?;
        Ok(self.read_ref(&target)?.and_then(|r| r.target_id()))
    }

    /// Create `name` pointing at `new`, failing (`Ok(false)`) if it exists.
    fn add_if_absent(&self, name: &str, new: ObjectId, update: &RefUpdate) -> Result<bool> {
        self.compare_and_set(name, None, new, update)
    }

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(HEADS_PREFIX)
    }

    /// List all tag refs.
    fn tags(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(TAGS_PREFIX)
    }
}
