//! End-to-end editing sessions against real stores.

use std::sync::Arc;

use twig_crypto::{Keyring, SigningKey};
use twig_refs::{FsRefStore, InMemoryRefStore, RefStore};
use twig_store::{
    Blob, FsObjectStore, InMemoryObjectStore, Object, ObjectStore, SignatureStatus, StoreError,
};
use twig_tree::{
    CommitConfig, CommitOptions, SessionState, TreeError, TreeRead, TreeReader, TreeWriter,
};
use twig_types::{IdentityKind, ObjectId, Timestamp};

const MAIN: &str = "refs/heads/main";

struct Repo {
    objects: Arc<InMemoryObjectStore>,
    refs: Arc<InMemoryRefStore>,
}

impl Repo {
    fn new() -> Self {
        Self {
            objects: Arc::new(InMemoryObjectStore::new()),
            refs: Arc::new(InMemoryRefStore::new()),
        }
    }

    fn writer(&self, ref_name: &str) -> TreeWriter {
        TreeWriter::open(self.objects.clone(), self.refs.clone(), ref_name).unwrap()
    }

    fn commit_of(&self, id: &ObjectId) -> twig_store::Commit {
        match self.objects.load(id).unwrap() {
            Object::Commit(commit) => commit,
            other => panic!("expected commit, got {:?}", other.kind()),
        }
    }
}

fn opts(message: &str) -> CommitOptions {
    CommitOptions::new(message)
        .with_committer("Ada <ada@example.com>")
        .with_commit_time(Timestamp::utc(1_700_000_000))
}

// ---------------------------------------------------------------------------
// Reads after writes
// ---------------------------------------------------------------------------

#[test]
fn set_data_then_get_returns_content() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    let id = w.set_data("docs/guide/intro.md", b"# Intro".to_vec(), None).unwrap();

    let object = w.get("/docs/guide/intro.md").unwrap();
    assert_eq!(object.as_blob().unwrap().data, b"# Intro");
    assert_eq!(w.lookup("docs/guide/intro.md").unwrap().1, id);
    assert_eq!(w.list_children("docs").unwrap(), vec!["guide"]);
}

#[test]
fn untouched_subtrees_keep_their_ids() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("a/b/x", b"x1".to_vec(), None).unwrap();
    w.set_data("a/c/y", b"y".to_vec(), None).unwrap();
    w.commit(&opts("seed")).unwrap();

    let c_before = w.lookup("a/c").unwrap().1;
    let b_before = w.lookup("a/b").unwrap().1;
    let a_before = w.lookup("a").unwrap().1;

    w.set_data("a/b/x", b"x2".to_vec(), None).unwrap();
    assert_eq!(w.lookup("a/c").unwrap().1, c_before);
    assert_ne!(w.lookup("a/b").unwrap().1, b_before);
    assert_ne!(w.lookup("a").unwrap().1, a_before);
}

#[test]
fn root_id_tracks_content() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("f", b"1".to_vec(), None).unwrap();
    let with_f = w.root_id().unwrap();
    w.set_data("g", b"2".to_vec(), None).unwrap();
    w.remove("g").unwrap();
    assert_eq!(w.root_id().unwrap(), with_f);
    assert_eq!(w.root_id().unwrap(), w.root().id().unwrap());
}

// ---------------------------------------------------------------------------
// Reference counting
// ---------------------------------------------------------------------------

#[test]
fn shared_blob_survives_deleting_one_path() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    let blob = w.set_data("one/copy", b"shared".to_vec(), None).unwrap();
    w.set_data("two/copy", b"shared".to_vec(), None).unwrap();
    w.remove("one/copy").unwrap();

    assert_eq!(w.get("two/copy").unwrap().as_blob().unwrap().data, b"shared");
    w.commit(&opts("keep one copy")).unwrap();
    assert!(repo.objects.exists(&blob).unwrap());
    assert!(w.exists("two/copy").unwrap());
}

#[test]
fn flush_twice_is_harmless() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    let blob = w.set_data("f", b"data".to_vec(), None).unwrap();

    let first = w.flush_staged().unwrap();
    let second = w.flush_staged().unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.objects.len(), 2);
    assert!(repo.objects.exists(&blob).unwrap());
    assert_eq!(w.staging().len(), 2);
}

// ---------------------------------------------------------------------------
// Deletion and pruning
// ---------------------------------------------------------------------------

#[test]
fn remove_then_exists_is_false() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("dir/file", b"x".to_vec(), None).unwrap();
    w.remove("dir/file").unwrap();
    assert!(!w.exists("dir/file").unwrap());

    let err = w.remove("dir/file").unwrap_err();
    assert!(matches!(err, TreeError::NotFound(_)));
}

#[test]
fn deleting_sole_entry_keeps_empty_tree_until_pruned() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("a/b/only", b"x".to_vec(), None).unwrap();
    w.remove("a/b/only").unwrap();

    assert!(w.exists("a/b").unwrap());
    assert!(w.list_children("a/b").unwrap().is_empty());

    assert_eq!(w.prune_empty_trees().unwrap(), 2);
    assert!(!w.exists("a").unwrap());
    assert!(w.root().is_empty());
}

#[test]
fn failed_set_leaves_session_untouched() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("file", b"x".to_vec(), None).unwrap();
    let root = w.root_id().unwrap();
    let staged = w.staging().ids();

    assert!(matches!(
        w.set_data("file/nested", b"y".to_vec(), None).unwrap_err(),
        TreeError::NotATree(_)
    ));
    assert!(matches!(
        w.remove("missing/deep").unwrap_err(),
        TreeError::NotFound(_)
    ));
    assert!(matches!(
        w.set_data("bad//path", b"y".to_vec(), None).unwrap_err(),
        TreeError::InvalidPath(_)
    ));

    assert_eq!(w.root_id().unwrap(), root);
    assert_eq!(w.staging().ids(), staged);
}

// ---------------------------------------------------------------------------
// Commit and compare-and-swap
// ---------------------------------------------------------------------------

#[test]
fn first_commit_has_no_parents() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    assert_eq!(w.head(), None);
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let id = w.commit(&opts("initial")).unwrap();

    assert_eq!(repo.refs.resolve(MAIN).unwrap(), Some(id));
    let commit = repo.commit_of(&id);
    assert!(commit.parents.is_empty());
    assert_eq!(commit.committer.to_string(), "Ada <ada@example.com>");
    assert_eq!(commit.author, commit.committer);
    assert_eq!(commit.author_time, commit.commit_time);
    assert_eq!(commit.encoding, "UTF-8");

    let log = repo.refs.reflog(MAIN).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].old, None);
    assert_eq!(log[0].message, "commit (initial): initial");
}

#[test]
fn second_commit_chains_to_first() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("f", b"1".to_vec(), None).unwrap();
    let first = w.commit(&opts("one")).unwrap();
    w.set_data("f", b"2".to_vec(), None).unwrap();
    let second = w.commit(&opts("two\n\ndetails")).unwrap();

    assert_eq!(repo.commit_of(&second).parents, vec![first]);
    let log = repo.refs.reflog(MAIN).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].old, Some(first));
    assert_eq!(log[1].new, second);
    assert_eq!(log[1].message, "commit: two");
}

#[test]
fn racing_sessions_on_unborn_ref_conflict() {
    let repo = Repo::new();
    let mut first = repo.writer(MAIN);
    let mut second = repo.writer(MAIN);

    first.set_data("winner", b"1".to_vec(), None).unwrap();
    second.set_data("loser", b"2".to_vec(), None).unwrap();
    let won = first.commit(&opts("first")).unwrap();

    let err = second.commit(&opts("second")).unwrap_err();
    assert!(matches!(&err, TreeError::CommitConflict { ref_name } if ref_name == MAIN));
    assert_eq!(second.state(), SessionState::Conflicted);
    assert_eq!(repo.refs.resolve(MAIN).unwrap(), Some(won));
    assert_eq!(repo.refs.reflog(MAIN).unwrap().len(), 1);

    // The losing session keeps its edits and can carry on.
    assert!(second.exists("loser").unwrap());
    second.set_data("more", b"3".to_vec(), None).unwrap();
    assert_eq!(second.state(), SessionState::Dirty);

    second.reset().unwrap();
    assert_eq!(second.head(), Some(won));
    assert!(second.exists("winner").unwrap());
    second.set_data("loser", b"2".to_vec(), None).unwrap();
    let retried = second.commit(&opts("second, rebased")).unwrap();
    assert_eq!(repo.commit_of(&retried).parents, vec![won]);
}

#[test]
fn stale_head_conflicts_on_existing_ref() {
    let repo = Repo::new();
    let mut seed = repo.writer(MAIN);
    seed.set_data("f", b"0".to_vec(), None).unwrap();
    seed.commit(&opts("seed")).unwrap();

    let mut a = repo.writer(MAIN);
    let mut b = repo.writer(MAIN);
    a.set_data("f", b"a".to_vec(), None).unwrap();
    b.set_data("f", b"b".to_vec(), None).unwrap();
    let a_id = a.commit(&opts("a")).unwrap();
    assert!(matches!(
        b.commit(&opts("b")).unwrap_err(),
        TreeError::CommitConflict { .. }
    ));
    assert_eq!(repo.refs.resolve(MAIN).unwrap(), Some(a_id));
}

#[test]
fn invalid_identity_changes_nothing() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let staged = w.staging().ids();
    let objects_before = repo.objects.len();

    let bad = CommitOptions::new("m").with_author("Broken <a@b");
    assert!(matches!(
        w.commit(&bad).unwrap_err(),
        TreeError::InvalidIdentity(IdentityKind::Author, _)
    ));
    assert_eq!(w.state(), SessionState::Dirty);
    assert_eq!(w.staging().ids(), staged);
    assert_eq!(repo.objects.len(), objects_before);
    assert_eq!(repo.refs.resolve(MAIN).unwrap(), None);
}

#[test]
fn identities_fall_back_to_config() {
    let repo = Repo::new();
    let config = CommitConfig::from_toml_str(
        "[user]\nname = \"Config User\"\nemail = \"config@example.com\"",
    )
    .unwrap();
    let mut w = repo.writer(MAIN).with_identity_source(Arc::new(config));
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let id = w.commit(&CommitOptions::new("m")).unwrap();

    let commit = repo.commit_of(&id);
    assert_eq!(commit.author.to_string(), "Config User <config@example.com>");
    assert_eq!(commit.committer.to_string(), "Config User <config@example.com>");
}

#[test]
fn signed_commit_verifies_against_signer_key() {
    let repo = Repo::new();
    let key = SigningKey::from_bytes([42; 32]);
    let expected = key.verifying_key();
    let mut keyring = Keyring::new();
    keyring.insert("release", key);

    let mut w = repo.writer(MAIN).with_signer(Arc::new(keyring));
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let id = w
        .commit(&opts("signed").with_signing_key("release"))
        .unwrap();

    let commit = repo.commit_of(&id);
    let signature = commit.signature.as_ref().unwrap();
    assert_eq!(signature.public_key, expected);
    assert_eq!(signature.key_id.as_deref(), Some("release"));
    assert_eq!(commit.verify_signature().unwrap(), SignatureStatus::Valid);
    assert!(expected
        .verify(&commit.signing_payload().unwrap(), &signature.signature)
        .is_ok());
}

#[test]
fn commit_through_symbolic_head_advances_branch() {
    let repo = Repo::new();
    repo.refs.set_symbolic("HEAD", MAIN).unwrap();
    let mut w = repo.writer("HEAD");
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let id = w.commit(&opts("via HEAD")).unwrap();

    assert_eq!(repo.refs.resolve(MAIN).unwrap(), Some(id));
    assert!(repo.refs.read_ref("HEAD").unwrap().unwrap().is_symbolic());
    let reader = TreeReader::open(repo.objects.clone(), repo.refs.clone(), "main").unwrap();
    assert!(reader.exists("f").unwrap());
}

#[test]
fn reader_sees_commit_after_reset() {
    let repo = Repo::new();
    let mut w = repo.writer(MAIN);
    w.set_data("v", b"1".to_vec(), None).unwrap();
    w.commit(&opts("one")).unwrap();

    let mut reader = TreeReader::open(repo.objects.clone(), repo.refs.clone(), "main").unwrap();
    w.set_data("v", b"2".to_vec(), None).unwrap();
    w.commit(&opts("two")).unwrap();

    assert_eq!(reader.get("v").unwrap().as_blob().unwrap().data, b"1");
    reader.reset().unwrap();
    assert_eq!(reader.get("v").unwrap().as_blob().unwrap().data, b"2");
}

// ---------------------------------------------------------------------------
// Filesystem stores
// ---------------------------------------------------------------------------

#[test]
fn filesystem_repository_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let open = || -> TreeWriter {
        let objects = Arc::new(FsObjectStore::open(dir.path()).unwrap());
        let refs = Arc::new(FsRefStore::open(dir.path()).unwrap());
        refs.set_symbolic("HEAD", MAIN).unwrap();
        TreeWriter::open(objects, refs, "HEAD").unwrap()
    };

    let first = {
        let mut w = open();
        w.set_data("src/lib.rs", b"pub fn f() {}".to_vec(), None).unwrap();
        w.commit(&opts("add lib")).unwrap()
    };

    let mut w = open();
    assert_eq!(w.head(), Some(first));
    assert_eq!(
        w.get("src/lib.rs").unwrap().as_blob().unwrap().data,
        b"pub fn f() {}"
    );
    w.remove("src/lib.rs").unwrap();
    let second = w.commit(&opts("remove lib")).unwrap();

    let refs = FsRefStore::open(dir.path()).unwrap();
    let log = refs.reflog(MAIN).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].old, Some(first));
    assert_eq!(log[1].new, second);
}

#[test]
fn filesystem_corruption_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let objects = Arc::new(FsObjectStore::open(dir.path()).unwrap());
    let refs = Arc::new(FsRefStore::open(dir.path()).unwrap());
    let mut w = TreeWriter::open(objects.clone(), refs.clone(), MAIN).unwrap();
    let genuine = w.set_data("f", b"genuine".to_vec(), None).unwrap();
    w.commit(&opts("c")).unwrap();

    // Replace the blob's file with another well-formed object.
    let other = objects
        .write(&Blob::new(b"forged".to_vec()).to_stored_object())
        .unwrap();
    let file = |id: &ObjectId| {
        let hex = id.to_hex();
        dir.path().join("objects").join(&hex[..2]).join(&hex[2..])
    };
    std::fs::copy(file(&other), file(&genuine)).unwrap();

    let reader = TreeReader::open(objects, refs, "main").unwrap();
    assert!(matches!(
        reader.get("f").unwrap_err(),
        TreeError::Store(StoreError::HashMismatch { .. })
    ));
}

#[test]
fn unwritable_reflog_fails_commit_without_moving_ref() {
    let dir = tempfile::tempdir().unwrap();
    let objects = Arc::new(FsObjectStore::open(dir.path()).unwrap());
    let refs = Arc::new(FsRefStore::open(dir.path()).unwrap());
    let mut w = TreeWriter::open(objects, refs.clone(), MAIN).unwrap();
    w.set_data("f", b"x".to_vec(), None).unwrap();
    let staged = w.staging().ids();

    std::fs::write(dir.path().join("logs"), "").unwrap();
    assert!(matches!(w.commit(&opts("c")).unwrap_err(), TreeError::Ref(_)));
    assert_eq!(refs.resolve(MAIN).unwrap(), None);
    assert_eq!(w.head(), None);
    assert_eq!(w.state(), SessionState::Dirty);
    assert_eq!(w.staging().ids(), staged);

    std::fs::remove_file(dir.path().join("logs")).unwrap();
    let id = w.commit(&opts("c")).unwrap();
    assert_eq!(refs.resolve(MAIN).unwrap(), Some(id));
    assert_eq!(refs.reflog(MAIN).unwrap().len(), 1);
}
