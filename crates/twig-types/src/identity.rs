use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The role an identity plays in a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    /// The person who originally wrote the change.
    Author,
    /// The person who recorded the change as a commit.
    Committer,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Author => write!(f, "author"),
            Self::Committer => write!(f, "committer"),
        }
    }
}

/// An authorship identity of the form `Name <email>`.
///
/// Identities are validated on construction: neither part may contain angle
/// brackets, NUL bytes, or newlines, and the email must be non-empty. The
/// serialized form is the `Name <email>` string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    name: String,
    email: String,
}

impl Identity {
    /// Build an identity from separate name and email parts.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TypeError> {
        let identity = Self {
            name: name.into(),
            email: email.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Parse a `Name <email>` string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidIdentity {
            identity: s.to_string(),
            reason: reason.to_string(),
        };

        let (name, rest) = s
            .split_once(" <")
            .ok_or_else(|| invalid("expected 'Name <email>'"))?;
        let email = rest
            .strip_suffix('>')
            .ok_or_else(|| invalid("missing closing '>'"))?;
        Self::new(name, email).map_err(|_| invalid("name or email contains forbidden characters"))
    }

    /// Check the identity against the formatting rules.
    pub fn validate(&self) -> Result<(), TypeError> {
        let invalid = |reason: String| TypeError::InvalidIdentity {
            identity: self.to_string(),
            reason,
        };

        if self.email.is_empty() {
            return Err(invalid("email must not be empty".into()));
        }
        for (field, value) in [("name", &self.name), ("email", &self.email)] {
            if let Some(ch) = value.chars().find(|c| matches!(c, '<' | '>' | '\0' | '\n')) {
                return Err(invalid(format!("{field} contains forbidden character {ch:?}")));
            }
        }
        Ok(())
    }

    /// The display name part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email part (without angle brackets).
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl FromStr for Identity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed() {
        let id = Identity::parse("Ada Lovelace <ada@example.com>").unwrap();
        assert_eq!(id.name(), "Ada Lovelace");
        assert_eq!(id.email(), "ada@example.com");
        assert_eq!(id.to_string(), "Ada Lovelace <ada@example.com>");
    }

    #[test]
    fn parse_allows_empty_name() {
        let id = Identity::parse(" <bot@example.com>").unwrap();
        assert_eq!(id.name(), "");
    }

    #[test]
    fn reject_missing_brackets() {
        assert!(Identity::parse("Ada Lovelace").is_err());
        assert!(Identity::parse("Ada <ada@example.com").is_err());
    }

    #[test]
    fn reject_empty_email() {
        let err = Identity::new("Ada", "").unwrap_err();
        assert!(matches!(err, TypeError::InvalidIdentity { .. }));
    }

    #[test]
    fn reject_forbidden_characters() {
        assert!(Identity::new("Ada\nLovelace", "ada@example.com").is_err());
        assert!(Identity::new("Ada", "ada@exa\0mple.com").is_err());
        assert!(Identity::new("Ada <x>", "ada@example.com").is_err());
        assert!(Identity::parse("Ada <a>b>").is_err());
    }

    #[test]
    fn serde_uses_display_form() {
        let id = Identity::new("Ada", "ada@example.com").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Ada <ada@example.com>\"");
        let parsed: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_rejects_malformed() {
        let result: Result<Identity, _> = serde_json::from_str("\"no brackets\"");
        assert!(result.is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(IdentityKind::Author.to_string(), "author");
        assert_eq!(IdentityKind::Committer.to_string(), "committer");
    }
}
