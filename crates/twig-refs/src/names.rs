//! Ref name validation following git-style conventions.
//!
//! A valid ref name is either `HEAD` or a path under `refs/` that:
//! - does not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - does not contain `..` or `@{`
//! - does not end with `.`, `/` or `.lock`
//! - has no empty components and no component starting with `.`

use crate::error::{RefError, Result};

/// The conventional symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";
/// Namespace for branches.
pub const HEADS_PREFIX: &str = "refs/heads/";
/// Namespace for tags.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full ref name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use twig_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("HEAD").is_ok());
/// assert!(validate_ref_name("refs/heads/feature/auth").is_ok());
/// assert!(validate_ref_name("main").is_err());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name == HEAD {
        return Ok(());
    }
    let Some(rest) = name.strip_prefix("refs/") else {
        return Err(invalid(name, "must be HEAD or start with 'refs/'"));
    };
    if rest.is_empty() {
        return Err(invalid(name, "missing name after 'refs/'"));
    }

    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid(name, "contains a control character"));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('.') || name.ends_with('/') {
        return Err(invalid(name, "must not end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_ref_name("HEAD").is_ok());
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("refs/heads/feature/deep/nested").is_ok());
        assert!(validate_ref_name("refs/tags/v1.0").is_ok());
    }

    #[test]
    fn reject_outside_refs_namespace() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("main").is_err());
        assert!(validate_ref_name("refs/").is_err());
        assert!(validate_ref_name("head").is_err());
    }

    #[test]
    fn reject_double_dot() {
        assert!(validate_ref_name("refs/heads/a..b").is_err());
        assert!(validate_ref_name("refs/../HEAD").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for name in [
            "refs/heads/has space",
            "refs/heads/a~b",
            "refs/heads/a^b",
            "refs/heads/a:b",
            "refs/heads/a?b",
            "refs/heads/a*b",
            "refs/heads/a[b",
            "refs/heads/a\\b",
            "refs/heads/a\u{7f}b",
        ] {
            assert!(validate_ref_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn reject_bad_endings() {
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("refs/heads/main.").is_err());
        assert!(validate_ref_name("refs/heads/main/").is_err());
    }

    #[test]
    fn reject_bad_components() {
        assert!(validate_ref_name("refs/heads//main").is_err());
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
        assert!(validate_ref_name("refs/heads/ref@{0}").is_err());
    }
}
