//! Commit assembly: options, identity and timestamp defaults, signing.

use tracing::debug;
use twig_crypto::Signer;
use twig_store::{Commit, CommitSignature};
use twig_types::{Identity, IdentityKind, ObjectId, Timestamp};

use crate::config::IdentitySource;
use crate::error::{TreeError, TreeResult};

/// Text encoding recorded on every commit.
pub const COMMIT_ENCODING: &str = "UTF-8";

/// What to record in a commit. Unset fields fall back to the session's
/// [`IdentitySource`] and then to built-in defaults.
#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    pub message: String,
    /// `Name <email>`; parsed and validated at commit time.
    pub committer: Option<String>,
    /// `Name <email>`; parsed and validated at commit time.
    pub author: Option<String>,
    pub commit_time: Option<Timestamp>,
    pub author_time: Option<Timestamp>,
    /// `Some(true)` / `Some(false)` force signing on or off; `None` defers to
    /// the configuration.
    pub sign: Option<bool>,
    pub signing_key: Option<String>,
}

impl CommitOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_committer(mut self, identity: impl Into<String>) -> Self {
        self.committer = Some(identity.into());
        self
    }

    pub fn with_author(mut self, identity: impl Into<String>) -> Self {
        self.author = Some(identity.into());
        self
    }

    pub fn with_commit_time(mut self, time: Timestamp) -> Self {
        self.commit_time = Some(time);
        self
    }

    pub fn with_author_time(mut self, time: Timestamp) -> Self {
        self.author_time = Some(time);
        self
    }

    pub fn with_sign(mut self, sign: bool) -> Self {
        self.sign = Some(sign);
        self
    }

    /// Sign with the named key (implies signing).
    pub fn with_signing_key(mut self, key_id: impl Into<String>) -> Self {
        self.sign = Some(true);
        self.signing_key = Some(key_id.into());
        self
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    fn identity(
        &self,
        kind: IdentityKind,
        source: &dyn IdentitySource,
    ) -> TreeResult<Identity> {
        let explicit = match kind {
            IdentityKind::Author => &self.author,
            IdentityKind::Committer => &self.committer,
        };
        let invalid = |e| TreeError::InvalidIdentity(kind, e);
        let identity = match explicit {
            Some(raw) => Identity::parse(raw).map_err(invalid)?,
            None => source.default_identity(kind).map_err(invalid)?,
        };
        identity.validate().map_err(invalid)?;
        Ok(identity)
    }
}

/// Reflog message for a commit moving a ref.
pub fn reflog_message(subject: &str, initial: bool) -> String {
    if initial {
        format!("commit (initial): {subject}")
    } else {
        format!("commit: {subject}")
    }
}

/// Build (and possibly sign) the commit object for `tree` on top of `head`.
///
/// Identities are resolved and validated before anything else, so an
/// invalid identity fails without side effects.
pub(crate) fn assemble(
    options: &CommitOptions,
    tree: ObjectId,
    head: Option<ObjectId>,
    source: &dyn IdentitySource,
    signer: Option<&dyn Signer>,
) -> TreeResult<Commit> {
    let committer = options.identity(IdentityKind::Committer, source)?;
    let author = options.identity(IdentityKind::Author, source)?;

    let commit_time = options.commit_time.unwrap_or_else(Timestamp::now_utc);
    let author_time = options.author_time.unwrap_or(commit_time);

    let mut commit = Commit {
        tree,
        parents: head.into_iter().collect(),
        author,
        author_time,
        committer,
        commit_time,
        encoding: COMMIT_ENCODING.to_string(),
        message: options.message.clone(),
        signature: None,
    };

    let sign = options
        .sign
        .unwrap_or_else(|| source.default_signing_requested());
    if sign {
        let key_id = options
            .signing_key
            .clone()
            .or_else(|| source.default_signing_key());
        let signer = signer
            .ok_or_else(|| TreeError::Signing("no signer configured".into()))?;
        let payload = commit.signing_payload()?;
        let signing_error = |e: twig_crypto::SignatureError| TreeError::Signing(e.to_string());
        let signature = signer
            .sign(&payload, key_id.as_deref())
            .map_err(signing_error)?;
        let public_key = signer
            .verifying_key(key_id.as_deref())
            .map_err(signing_error)?;
        debug!(key = ?key_id, "signed commit");
        commit.signature = Some(CommitSignature {
            key_id,
            public_key,
            signature,
        });
    }

    Ok(commit)
}
