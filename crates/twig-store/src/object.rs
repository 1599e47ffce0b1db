use serde::{Deserialize, Serialize};
use twig_crypto::{ContentHasher, Signature, VerifyingKey};
use twig_types::{Identity, ObjectId, Timestamp};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// A revision pointing at a root tree.
    Commit,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + encoded data + cached size.
///
/// `StoredObject` is the unit of storage. Backends key it by
/// [`StoredObject::compute_id`] and never look inside `data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The encoded bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        let hasher = match self.kind {
            ObjectKind::Blob => &ContentHasher::BLOB,
            ObjectKind::Tree => &ContentHasher::TREE,
            ObjectKind::Commit => &ContentHasher::COMMIT,
        };
        hasher.hash(&self.data)
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Convert into a `StoredObject` for storage. Blob bytes are stored as-is.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }

    /// The content-addressed ID of this blob.
    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value (for display).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// Returns `true` for [`EntryMode::Directory`].
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory).
    pub mode: EntryMode,
    /// Entry name (a single path segment).
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

/// Directory listing object (analogous to git tree).
///
/// Entries are kept sorted by name with unique names, which makes the
/// encoding (and therefore the id) canonical. A `Tree` value is an ordinary
/// owned value: editing a copy never affects the original, and the id of an
/// edited copy is recomputed from its content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree from entries in any order.
    ///
    /// When several entries share a name the last one wins.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        let mut tree = Self::empty();
        for entry in entries {
            tree.insert(entry);
        }
        tree
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The id every empty tree has.
    pub fn empty_id() -> ObjectId {
        // Encoding an empty tree cannot fail.
        ContentHasher::TREE.hash(br#"{"entries":[]}"#)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode from a `StoredObject`, checking canonical entry order.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        let tree: Self = serde_json::from_slice(&obj.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if tree.entries.windows(2).any(|w| w[0].name >= w[1].name) {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: "tree entries are not strictly sorted by name".into(),
            });
        }
        Ok(tree)
    }

    /// The content-addressed ID of this tree, computed from its entries.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.position(name).ok().map(|i| &self.entries[i])
    }

    /// Insert or replace the entry with `entry.name`, returning the old one.
    pub fn insert(&mut self, entry: TreeEntry) -> Option<TreeEntry> {
        match self.position(&entry.name) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i], entry)),
            Err(i) => {
                self.entries.insert(i, entry);
                None
            }
        }
    }

    /// Remove the entry called `name`, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<TreeEntry> {
        self.position(name).ok().map(|i| self.entries.remove(i))
    }

    /// Entries in name order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Entry names in order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A detached signature over a commit's unsigned encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSignature {
    /// Id of the key that produced the signature, if one was named.
    pub key_id: Option<String>,
    /// Public half of the signing key.
    pub public_key: VerifyingKey,
    /// Signature over [`Commit::signing_payload`].
    pub signature: Signature,
}

/// Outcome of checking a commit's embedded signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The commit carries no signature.
    Unsigned,
    /// The signature verifies against the embedded public key.
    Valid,
    /// The signature does not verify.
    Invalid,
}

/// A revision: snapshot of a root tree plus history and authorship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits (empty for a root commit).
    pub parents: Vec<ObjectId>,
    /// Who wrote the change.
    pub author: Identity,
    /// When the change was written.
    pub author_time: Timestamp,
    /// Who recorded the commit.
    pub committer: Identity,
    /// When the commit was recorded.
    pub commit_time: Timestamp,
    /// Text encoding of the message.
    pub encoding: String,
    /// Free-form commit message.
    pub message: String,
    /// Optional signature over the unsigned encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<CommitSignature>,
}

impl Commit {
    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// The content-addressed ID of this commit (signature included).
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// The bytes a signer signs: the encoding with no signature attached.
    pub fn signing_payload(&self) -> StoreResult<Vec<u8>> {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        Ok(unsigned.to_stored_object()?.data)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Check the embedded signature against the embedded public key.
    pub fn verify_signature(&self) -> StoreResult<SignatureStatus> {
        let Some(sig) = &self.signature else {
            return Ok(SignatureStatus::Unsigned);
        };
        let payload = self.signing_payload()?;
        Ok(match sig.public_key.verify(&payload, &sig.signature) {
            Ok(()) => SignatureStatus::Valid,
            Err(_) => SignatureStatus::Invalid,
        })
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Any decoded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    /// The kind tag of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }

    /// Encode for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        match self {
            Self::Blob(b) => Ok(b.to_stored_object()),
            Self::Tree(t) => t.to_stored_object(),
            Self::Commit(c) => c.to_stored_object(),
        }
    }

    /// Decode any stored object according to its kind tag.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        Ok(match obj.kind {
            ObjectKind::Blob => Self::Blob(Blob::from_stored_object(obj)?),
            ObjectKind::Tree => Self::Tree(Tree::from_stored_object(obj)?),
            ObjectKind::Commit => Self::Commit(Commit::from_stored_object(obj)?),
        })
    }

    /// The content-addressed ID of this object.
    pub fn id(&self) -> StoreResult<ObjectId> {
        match self {
            Self::Blob(b) => Ok(b.id()),
            Self::Tree(t) => t.id(),
            Self::Commit(c) => c.id(),
        }
    }

    /// Returns `true` if this is a tree with no entries.
    pub fn is_empty_tree(&self) -> bool {
        matches!(self, Self::Tree(t) if t.is_empty())
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twig_crypto::SigningKey;

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_hash([n; 32])
    }

    fn sample_commit() -> Commit {
        Commit {
            tree: Tree::empty_id(),
            parents: vec![],
            author: Identity::new("Ada", "ada@example.com").unwrap(),
            author_time: Timestamp::utc(1_700_000_000),
            committer: Identity::new("Ada", "ada@example.com").unwrap(),
            commit_time: Timestamp::utc(1_700_000_000),
            encoding: "UTF-8".into(),
            message: "initial import\n\nlonger body".into(),
            signature: None,
        }
    }

    #[test]
    fn blob_id_matches_stored_id() {
        let blob = Blob::new(b"hello world".to_vec());
        assert_eq!(blob.id(), blob.to_stored_object().compute_id());
        let decoded = Blob::from_stored_object(&blob.to_stored_object()).unwrap();
        assert_eq!(blob, decoded);
    }

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_entries_sorted_and_unique() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "zebra.txt", oid(1)),
            TreeEntry::new(EntryMode::Regular, "alpha.txt", oid(2)),
            TreeEntry::new(EntryMode::Directory, "middle", oid(3)),
            TreeEntry::new(EntryMode::Regular, "alpha.txt", oid(4)),
        ]);
        assert_eq!(tree.names(), vec!["alpha.txt", "middle", "zebra.txt"]);
        assert_eq!(tree.get("alpha.txt").unwrap().object_id, oid(4));
    }

    #[test]
    fn tree_insert_replace_remove() {
        let mut tree = Tree::empty();
        assert!(tree.insert(TreeEntry::new(EntryMode::Regular, "b", oid(1))).is_none());
        assert!(tree.insert(TreeEntry::new(EntryMode::Regular, "a", oid(2))).is_none());
        let old = tree
            .insert(TreeEntry::new(EntryMode::Executable, "b", oid(3)))
            .unwrap();
        assert_eq!(old.object_id, oid(1));
        assert_eq!(tree.names(), vec!["a", "b"]);

        let removed = tree.remove("a").unwrap();
        assert_eq!(removed.object_id, oid(2));
        assert!(tree.remove("a").is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn editing_a_copy_leaves_original_untouched() {
        let original = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "f", oid(1))]);
        let original_id = original.id().unwrap();

        let mut copy = original.clone();
        copy.insert(TreeEntry::new(EntryMode::Regular, "g", oid(2)));

        assert_eq!(original.len(), 1);
        assert_eq!(original.id().unwrap(), original_id);
        assert_ne!(copy.id().unwrap(), original_id);
    }

    #[test]
    fn tree_id_depends_only_on_content() {
        let a = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "x", oid(1)),
            TreeEntry::new(EntryMode::Regular, "y", oid(2)),
        ]);
        let b = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "y", oid(2)),
            TreeEntry::new(EntryMode::Regular, "x", oid(1)),
        ]);
        assert_eq!(a.id().unwrap(), b.id().unwrap());
    }

    #[test]
    fn empty_id_matches_encoding() {
        assert_eq!(Tree::empty().id().unwrap(), Tree::empty_id());
    }

    #[test]
    fn tree_decode_rejects_unsorted_entries() {
        let unsorted = Tree {
            entries: vec![
                TreeEntry::new(EntryMode::Regular, "b", oid(1)),
                TreeEntry::new(EntryMode::Regular, "a", oid(1)),
            ],
        };
        let data = serde_json::to_vec(&unsorted).unwrap();
        let stored = StoredObject::new(ObjectKind::Tree, data);
        let err = Tree::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_decode_rejects_duplicate_names() {
        let duplicated = Tree {
            entries: vec![
                TreeEntry::new(EntryMode::Regular, "a", oid(1)),
                TreeEntry::new(EntryMode::Regular, "a", oid(2)),
            ],
        };
        let data = serde_json::to_vec(&duplicated).unwrap();
        let stored = StoredObject::new(ObjectKind::Tree, data);
        assert!(Tree::from_stored_object(&stored).is_err());
    }

    #[test]
    fn entry_mode_bits_roundtrip() {
        for mode in [
            EntryMode::Regular,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Directory,
        ] {
            assert_eq!(EntryMode::from_mode_bits(mode.mode_bits()), Some(mode));
        }
        assert!(EntryMode::from_mode_bits(0o777).is_none());
        assert_eq!(EntryMode::Directory.to_string(), "040000");
    }

    #[test]
    fn commit_decode_and_summary() {
        let commit = sample_commit();
        let stored = commit.to_stored_object().unwrap();
        assert_eq!(Commit::from_stored_object(&stored).unwrap(), commit);
        assert_eq!(commit.summary(), "initial import");
    }

    #[test]
    fn unsigned_commit_payload_is_its_encoding() {
        let commit = sample_commit();
        assert_eq!(
            commit.signing_payload().unwrap(),
            commit.to_stored_object().unwrap().data
        );
        assert_eq!(commit.verify_signature().unwrap(), SignatureStatus::Unsigned);
    }

    #[test]
    fn signed_commit_verifies_and_changes_id() {
        let key = SigningKey::from_bytes([9; 32]);
        let mut commit = sample_commit();
        let unsigned_id = commit.id().unwrap();
        let payload = commit.signing_payload().unwrap();
        commit.signature = Some(CommitSignature {
            key_id: Some("release".into()),
            public_key: key.verifying_key(),
            signature: key.sign(&payload),
        });

        assert_eq!(commit.verify_signature().unwrap(), SignatureStatus::Valid);
        assert_ne!(commit.id().unwrap(), unsigned_id);

        commit.message.push_str(" (tampered)");
        assert_eq!(commit.verify_signature().unwrap(), SignatureStatus::Invalid);
    }

    #[test]
    fn object_dispatch_by_kind() {
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "f", oid(1))]);
        let objects = [
            Object::from(Blob::new(b"data".to_vec())),
            Object::from(tree),
            Object::from(sample_commit()),
        ];
        for object in objects {
            let stored = object.to_stored_object().unwrap();
            assert_eq!(stored.kind, object.kind());
            assert_eq!(object.id().unwrap(), stored.compute_id());
            assert_eq!(Object::from_stored_object(&stored).unwrap(), object);
        }
    }

    #[test]
    fn empty_tree_detection() {
        assert!(Object::from(Tree::empty()).is_empty_tree());
        assert!(!Object::from(Blob::new(Vec::new())).is_empty_tree());
    }

    #[test]
    fn object_kind_display() {
        assert_eq!(ObjectKind::Blob.to_string(), "blob");
        assert_eq!(ObjectKind::Tree.to_string(), "tree");
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
    }
}
