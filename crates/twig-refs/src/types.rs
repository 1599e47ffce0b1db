//! Core reference types.

use serde::{Deserialize, Serialize};
use twig_types::{Identity, ObjectId, Timestamp};

/// The value stored under a ref name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    /// Points directly at an object (normally a commit).
    Direct(ObjectId),
    /// Names another ref, e.g. `HEAD -> refs/heads/main`.
    Symbolic(String),
}

impl Ref {
    /// The object id of a direct ref.
    pub fn target_id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }

    /// The ref name a symbolic ref points to.
    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            Ref::Direct(_) => None,
            Ref::Symbolic(target) => Some(target),
        }
    }

    /// Returns `true` if this is a symbolic ref.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }
}

/// Metadata attached to a ref update and recorded in the reflog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefUpdate {
    /// Who performed the update.
    pub committer: Identity,
    /// When the update happened.
    pub timestamp: Timestamp,
    /// Why the ref moved, e.g. `commit: fix typo`.
    pub message: String,
}

impl RefUpdate {
    pub fn new(committer: Identity, timestamp: Timestamp, message: impl Into<String>) -> Self {
        Self {
            committer,
            timestamp,
            message: message.into(),
        }
    }
}

/// One line of a ref's update history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefLogEntry {
    /// Previous value (`None` when the ref was created).
    pub old: Option<ObjectId>,
    /// New value.
    pub new: ObjectId,
    pub committer: Identity,
    pub timestamp: Timestamp,
    pub message: String,
}

impl RefLogEntry {
    /// Build the entry recorded for a successful update.
    pub fn from_update(old: Option<ObjectId>, new: ObjectId, update: &RefUpdate) -> Self {
        Self {
            old,
            new,
            committer: update.committer.clone(),
            timestamp: update.timestamp,
            message: update.message.clone(),
        }
    }
}
