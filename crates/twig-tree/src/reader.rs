//! Read-only access to a tree snapshot.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;
use twig_refs::{validate_ref_name, RefStore, HEADS_PREFIX, TAGS_PREFIX};
use twig_store::{EntryMode, Object, ObjectStore, StoreError, Tree};
use twig_types::ObjectId;

use crate::error::{TreeError, TreeResult};
use crate::path;

/// Path navigation over a root tree.
///
/// Implementors supply the root and an object source; the walk itself is
/// shared. [`TreeReader`] reads from the object store, the writer consults
/// its staging table first.
pub trait TreeRead {
    /// The root tree of the snapshot.
    fn root(&self) -> &Tree;

    /// Load an object reachable from the root.
    fn load_object(&self, id: &ObjectId) -> TreeResult<Object>;

    /// Id of the root tree, computed from its current content.
    fn root_id(&self) -> TreeResult<ObjectId> {
        Ok(self.root().id()?)
    }

    /// Mode and id of the entry at `path`. The empty path is the root itself.
    fn lookup(&self, path: &str) -> TreeResult<(EntryMode, ObjectId)> {
        let segments = path::split(path)?;
        let mut found = None;
        for (depth, name) in segments.iter().enumerate() {
            let tree = match &found {
                None => Cow::Borrowed(self.root()),
                Some((_, id)) => match self.load_object(id)? {
                    Object::Tree(tree) => Cow::Owned(tree),
                    _ => return Err(TreeError::NotATree(path::join(&segments[..depth]))),
                },
            };
            let entry = tree
                .get(name)
                .ok_or_else(|| TreeError::NotFound(path::join(&segments[..=depth])))?;
            found = Some((entry.mode, entry.object_id));
        }
        match found {
            Some(found) => Ok(found),
            None => Ok((EntryMode::Directory, self.root_id()?)),
        }
    }

    /// The object at `path`.
    fn get(&self, path: &str) -> TreeResult<Object> {
        if path::split(path)?.is_empty() {
            return Ok(Object::Tree(self.root().clone()));
        }
        let (_, id) = self.lookup(path)?;
        self.load_object(&id)
    }

    /// Names of the entries in the tree at `path`.
    fn list_children(&self, path: &str) -> TreeResult<Vec<String>> {
        match self.get(path)? {
            Object::Tree(tree) => Ok(tree.names()),
            _ => Err(TreeError::NotATree(path::join(&path::split(path)?))),
        }
    }

    /// Whether `path` resolves. Store and path-syntax errors are propagated.
    fn exists(&self, path: &str) -> TreeResult<bool> {
        match self.lookup(path) {
            Ok(_) => Ok(true),
            Err(TreeError::NotFound(_) | TreeError::NotATree(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Load `id` from the store, mapping absence to a store `NotFound`.
pub(crate) fn load(objects: &dyn ObjectStore, id: &ObjectId) -> TreeResult<Object> {
    Ok(objects.load(id)?)
}

/// Peel a commit to its tree; a tree is returned as-is.
pub(crate) fn peel_to_tree(
    objects: &dyn ObjectStore,
    id: &ObjectId,
    treeish: &str,
) -> TreeResult<Tree> {
    match load(objects, id)? {
        Object::Tree(tree) => Ok(tree),
        Object::Commit(commit) => match load(objects, &commit.tree)? {
            Object::Tree(tree) => Ok(tree),
            _ => Err(TreeError::Resolution(treeish.to_string())),
        },
        Object::Blob(_) => Err(TreeError::Resolution(treeish.to_string())),
    }
}

/// Resolve a treeish to a tree.
///
/// A 64-digit hex string naming a stored commit or tree is used directly.
/// Anything else is tried as a ref name as given, then under `refs/heads/`,
/// then under `refs/tags/`.
pub fn resolve_treeish(
    objects: &dyn ObjectStore,
    refs: &dyn RefStore,
    treeish: &str,
) -> TreeResult<Tree> {
    if let Ok(id) = ObjectId::from_hex(treeish) {
        match peel_to_tree(objects, &id, treeish) {
            Ok(tree) => return Ok(tree),
            Err(TreeError::Store(StoreError::NotFound(_))) => {}
            Err(e) => return Err(e),
        }
    }

    let candidates = [
        treeish.to_string(),
        format!("{HEADS_PREFIX}{treeish}"),
        format!("{TAGS_PREFIX}{treeish}"),
    ];
    for name in &candidates {
        if validate_ref_name(name).is_err() {
            continue;
        }
        if let Some(id) = refs.resolve(name)? {
            debug!(treeish, %name, %id, "resolved treeish");
            return peel_to_tree(objects, &id, treeish);
        }
    }
    Err(TreeError::Resolution(treeish.to_string()))
}

/// An immutable snapshot opened from a treeish.
pub struct TreeReader {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    treeish: String,
    tree: Tree,
}

impl TreeReader {
    /// Resolve `treeish` and open its tree.
    pub fn open(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        treeish: impl Into<String>,
    ) -> TreeResult<Self> {
        let treeish = treeish.into();
        let tree = resolve_treeish(objects.as_ref(), refs.as_ref(), &treeish)?;
        Ok(Self {
            objects,
            refs,
            treeish,
            tree,
        })
    }

    /// Re-resolve the treeish, picking up a ref that has moved.
    pub fn reset(&mut self) -> TreeResult<()> {
        self.tree = resolve_treeish(self.objects.as_ref(), self.refs.as_ref(), &self.treeish)?;
        Ok(())
    }

    /// The treeish this reader was opened with.
    pub fn treeish(&self) -> &str {
        &self.treeish
    }
}

impl TreeRead for TreeReader {
    fn root(&self) -> &Tree {
        &self.tree
    }

    fn load_object(&self, id: &ObjectId) -> TreeResult<Object> {
        load(self.objects.as_ref(), id)
    }
}

impl std::fmt::Debug for TreeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeReader")
            .field("treeish", &self.treeish)
            .field("entries", &self.tree.len())
            .finish()
    }
}
