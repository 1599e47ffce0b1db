//! Copy-on-write editing sessions over a ref.
//!
//! A [`TreeWriter`] loads the tree a ref points at, applies path edits by
//! rebuilding only the trees along each edited path, and publishes the
//! result as a commit with a single compare-and-swap on the ref. Objects
//! created along the way live in a [`StagingTable`] until the commit
//! persists them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use twig_crypto::Signer;
use twig_refs::{validate_ref_name, RefStore, RefUpdate};
use twig_store::{Blob, EntryMode, Object, ObjectStore, Tree, TreeEntry};
use twig_types::ObjectId;

use crate::commit::{assemble, reflog_message, CommitOptions};
use crate::config::{CommitConfig, IdentitySource};
use crate::error::{TreeError, TreeResult};
use crate::path;
use crate::reader::{load, peel_to_tree, TreeRead};
use crate::staging::StagingTable;

/// Lifecycle of an editing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The root equals the tree loaded on the last reset.
    Clean,
    /// At least one edit changed the root since the last reset.
    Dirty,
    /// A commit is being built and published.
    Committing,
    /// The last commit was published; the session is about to reset.
    Committed,
    /// The last commit lost the race for the ref.
    Conflicted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Conflicted => "conflicted",
        };
        f.write_str(s)
    }
}

/// What a single level of a `set` does to its tree.
enum Operand {
    Delete,
    Put(Object, EntryMode),
}

/// Objects created by one edit, keyed by id. They reach the staging table
/// only through the new root once the edit has fully succeeded.
type Fresh = HashMap<ObjectId, Object>;

/// Mode used when the caller does not give one.
fn default_mode(object: &Object) -> EntryMode {
    match object {
        Object::Tree(_) => EntryMode::Directory,
        _ => EntryMode::Regular,
    }
}

/// A transactional editing session on one ref.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use twig_refs::InMemoryRefStore;
/// # use twig_store::InMemoryObjectStore;
/// # use twig_tree::{CommitOptions, TreeRead, TreeWriter};
/// # fn main() -> twig_tree::TreeResult<()> {
/// let objects = Arc::new(InMemoryObjectStore::new());
/// let refs = Arc::new(InMemoryRefStore::new());
/// let mut writer = TreeWriter::open(objects, refs, "refs/heads/main")?;
/// writer.set_data("docs/README", b"hello".to_vec(), None)?;
/// let id = writer.commit(&CommitOptions::new("add readme"))?;
/// assert!(writer.exists("docs/README")?);
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
pub struct TreeWriter {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    identity: Arc<dyn IdentitySource>,
    signer: Option<Arc<dyn Signer>>,
    ref_name: String,
    head: Option<ObjectId>,
    tree: Tree,
    staging: StagingTable,
    state: SessionState,
}

impl TreeWriter {
    /// Open a session on `ref_name` (which may be symbolic or not exist yet).
    ///
    /// Identities default to a [`CommitConfig::default`]; use
    /// [`TreeWriter::with_identity_source`] to supply configuration.
    pub fn open(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        ref_name: impl Into<String>,
    ) -> TreeResult<Self> {
        let ref_name = ref_name.into();
        validate_ref_name(&ref_name)?;
        let mut writer = Self {
            objects,
            refs,
            identity: Arc::new(CommitConfig::default()),
            signer: None,
            ref_name,
            head: None,
            tree: Tree::empty(),
            staging: StagingTable::new(),
            state: SessionState::Clean,
        };
        writer.reset()?;
        Ok(writer)
    }

    /// Use `source` for identity and signing defaults.
    pub fn with_identity_source(mut self, source: Arc<dyn IdentitySource>) -> Self {
        self.identity = source;
        self
    }

    /// Use `signer` for signed commits.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Name of the ref this session commits to.
    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    /// Head commit observed on the last reset (`None` for an unborn ref).
    pub fn head(&self) -> Option<ObjectId> {
        self.head
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Objects created by this session and not yet released.
    pub fn staging(&self) -> &StagingTable {
        &self.staging
    }

    /// Re-read the ref, discard every staged object and return to `Clean`.
    pub fn reset(&mut self) -> TreeResult<()> {
        let head = self.refs.resolve(&self.ref_name)?;
        let tree = match &head {
            Some(id) => peel_to_tree(self.objects.as_ref(), id, &self.ref_name)?,
            None => Tree::empty(),
        };
        self.head = head;
        self.tree = tree;
        self.staging.clear();
        self.state = SessionState::Clean;
        debug!(ref_name = %self.ref_name, head = ?self.head, "session reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Put `object` at `path`, or delete the entry when `object` is `None`
    /// or an empty tree.
    ///
    /// Missing intermediate directories are created. `mode` defaults to
    /// `Directory` for trees and `Regular` otherwise. On error the session
    /// is unchanged.
    pub fn set(
        &mut self,
        path: &str,
        object: Option<Object>,
        mode: Option<EntryMode>,
    ) -> TreeResult<()> {
        let segments = path::split(path)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(TreeError::InvalidPath(path.to_string()));
        };

        // Trees along the path, root first; chain[i] holds segments[i].
        let mut chain = Vec::with_capacity(segments.len());
        chain.push(self.tree.clone());
        for (depth, name) in parents.iter().enumerate() {
            let next = match chain[depth].get(name) {
                None => Tree::empty(),
                Some(entry) => match self.load_object(&entry.object_id)? {
                    Object::Tree(tree) => tree,
                    _ => return Err(TreeError::NotATree(path::join(&segments[..=depth]))),
                },
            };
            chain.push(next);
        }

        let operand = match object {
            None => Operand::Delete,
            Some(object) if object.is_empty_tree() => Operand::Delete,
            Some(object) => {
                let mode = mode.unwrap_or_else(|| default_mode(&object));
                Operand::Put(object, mode)
            }
        };

        let mut fresh = Fresh::new();
        let mut level = chain
            .pop()
            .ok_or_else(|| TreeError::InvalidPath(path.to_string()))?;
        Self::apply(&mut level, leaf, operand, &mut fresh, &segments)?;
        for (mut parent, name) in chain.into_iter().zip(parents).rev() {
            let operand = Operand::Put(Object::Tree(level), EntryMode::Directory);
            Self::apply(&mut parent, name, operand, &mut fresh, &segments)?;
            level = parent;
        }

        let new_root = self.install(level, fresh)?;
        debug!(path = %path::join(&segments), root = %new_root, "set");
        Ok(())
    }

    /// Store `data` as a blob at `path` and return the blob's id.
    pub fn set_data(
        &mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        mode: Option<EntryMode>,
    ) -> TreeResult<ObjectId> {
        let blob = Blob::new(data);
        let id = blob.id();
        self.set(path, Some(Object::Blob(blob)), mode)?;
        Ok(id)
    }

    /// Delete the entry at `path`; `NotFound` if it does not exist.
    pub fn remove(&mut self, path: &str) -> TreeResult<()> {
        self.set(path, None, None)
    }

    /// Remove every empty sub-tree, deepest first. Returns how many trees
    /// were removed. The root itself is kept even when empty.
    pub fn prune_empty_trees(&mut self) -> TreeResult<usize> {
        let mut fresh = Fresh::new();
        let (pruned_root, pruned) = self.prune(&self.tree, &mut fresh)?;
        if pruned == 0 {
            return Ok(0);
        }
        let new_root = self.install(pruned_root, fresh)?;
        debug!(pruned, root = %new_root, "pruned empty trees");
        Ok(pruned)
    }

    fn prune(&self, tree: &Tree, fresh: &mut Fresh) -> TreeResult<(Tree, usize)> {
        let mut out = tree.clone();
        let mut pruned = 0;
        for entry in tree.entries().iter().filter(|e| e.mode.is_tree()) {
            let Object::Tree(child) = self.load_object(&entry.object_id)? else {
                continue;
            };
            let (child, removed) = self.prune(&child, fresh)?;
            pruned += removed;
            if child.is_empty() {
                out.remove(&entry.name);
                pruned += 1;
            } else if removed > 0 {
                let id = child.id()?;
                out.insert(TreeEntry::new(entry.mode, entry.name.clone(), id));
                fresh.insert(id, Object::Tree(child));
            }
        }
        Ok((out, pruned))
    }

    fn apply(
        tree: &mut Tree,
        name: &str,
        operand: Operand,
        fresh: &mut Fresh,
        segments: &[&str],
    ) -> TreeResult<()> {
        match operand {
            Operand::Delete => {
                tree.remove(name)
                    .ok_or_else(|| TreeError::NotFound(path::join(segments)))?;
            }
            Operand::Put(object, mode) => {
                let id = object.id()?;
                tree.insert(TreeEntry::new(mode, name, id));
                fresh.insert(id, object);
            }
        }
        Ok(())
    }

    /// Make `root` the session root. The new root is retained before the
    /// old one is released, so sub-graphs shared by both keep their counts;
    /// whatever only the old root reached is evicted with it.
    fn install(&mut self, root: Tree, mut fresh: Fresh) -> TreeResult<ObjectId> {
        let old_root = self.tree.id()?;
        let new_root = root.id()?;
        fresh.insert(new_root, Object::Tree(root.clone()));
        self.staging.retain(new_root, &mut fresh);
        self.staging.release(&old_root);
        self.tree = root;
        if old_root != new_root {
            self.state = SessionState::Dirty;
        }
        Ok(new_root)
    }

    // -----------------------------------------------------------------------
    // Persistence and commit
    // -----------------------------------------------------------------------

    /// Write every staged object to the object store. Staged objects stay
    /// staged; calling this twice is harmless.
    pub fn flush_staged(&self) -> TreeResult<usize> {
        let objects = self.staging.to_stored_objects()?;
        self.objects.write_batch(&objects)?;
        debug!(count = objects.len(), "flushed staged objects");
        Ok(objects.len())
    }

    /// Publish the current root as a commit on top of the observed head.
    ///
    /// On success the session takes the new commit as its head, keeps the
    /// committed root, empties staging and returns the id; the store is not
    /// read again. If the ref moved since the last reset the commit fails with
    /// [`TreeError::CommitConflict`]; the session keeps its edits and the
    /// objects already written stay in the store unreferenced.
    pub fn commit(&mut self, options: &CommitOptions) -> TreeResult<ObjectId> {
        let prior = self.state;
        self.state = SessionState::Committing;
        match self.publish(options) {
            Ok(id) => {
                self.state = SessionState::Committed;
                self.adopt(id);
                Ok(id)
            }
            Err(e @ TreeError::CommitConflict { .. }) => {
                self.state = SessionState::Conflicted;
                Err(e)
            }
            Err(e) => {
                self.state = prior;
                Err(e)
            }
        }
    }

    /// Take the just-published commit as the new baseline. Its tree is the
    /// current root and every staged object was flushed, so nothing needs
    /// to be read back.
    fn adopt(&mut self, commit: ObjectId) {
        self.head = Some(commit);
        self.staging.clear();
        self.state = SessionState::Clean;
        debug!(ref_name = %self.ref_name, head = %commit, "session moved to new commit");
    }

    fn publish(&mut self, options: &CommitOptions) -> TreeResult<ObjectId> {
        let commit = assemble(
            options,
            self.tree.id()?,
            self.head,
            self.identity.as_ref(),
            self.signer.as_deref(),
        )?;
        let update = RefUpdate::new(
            commit.committer.clone(),
            commit.commit_time,
            reflog_message(commit.summary(), self.head.is_none()),
        );

        let commit_id = self.staging.add(Object::Commit(commit))?;
        if let Err(e) = self.flush_staged() {
            self.staging.release(&commit_id);
            return Err(e);
        }

        let swapped = match self.head {
            None => self.refs.add_if_absent(&self.ref_name, commit_id, &update),
            Some(head) => self
                .refs
                .compare_and_set(&self.ref_name, Some(head), commit_id, &update),
        };
        // The commit is only staged for the flush; the session goes back to
        // holding exactly the edits it held before.
        self.staging.release(&commit_id);

        if !swapped? {
            warn!(ref_name = %self.ref_name, commit = %commit_id, "ref moved during commit");
            return Err(TreeError::CommitConflict {
                ref_name: self.ref_name.clone(),
            });
        }
        info!(ref_name = %self.ref_name, commit = %commit_id, "committed");
        Ok(commit_id)
    }
}

impl TreeRead for TreeWriter {
    fn root(&self) -> &Tree {
        &self.tree
    }

    fn load_object(&self, id: &ObjectId) -> TreeResult<Object> {
        match self.staging.get(id) {
            Some(object) => Ok(object.clone()),
            None => load(self.objects.as_ref(), id),
        }
    }
}

impl fmt::Debug for TreeWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWriter")
            .field("ref_name", &self.ref_name)
            .field("head", &self.head)
            .field("state", &self.state)
            .field("staged", &self.staging.len())
            .finish()
    }
}
