//! Slash-separated tree paths.
//!
//! One leading and one trailing `/` are ignored, so `"/a/b/"`, `"a/b"` and
//! `"/a/b"` all name the same entry. The empty path (`""` or `"/"`) is the
//! root tree.

use crate::error::{TreeError, TreeResult};

/// Split `path` into its segments.
///
/// Fails with [`TreeError::InvalidPath`] on empty interior segments
/// (`a//b`), on `.` / `..` segments and on NUL bytes.
pub fn split(path: &str) -> TreeResult<Vec<&str>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    let malformed = segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\0'));
    if malformed {
        return Err(TreeError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Join segments back into a canonical path (no leading or trailing `/`).
pub fn join(segments: &[&str]) -> String {
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_paths() {
        assert!(split("").unwrap().is_empty());
        assert!(split("/").unwrap().is_empty());
    }

    #[test]
    fn one_leading_and_trailing_slash_ignored() {
        assert_eq!(split("a/b").unwrap(), vec!["a", "b"]);
        assert_eq!(split("/a/b").unwrap(), vec!["a", "b"]);
        assert_eq!(split("a/b/").unwrap(), vec!["a", "b"]);
        assert_eq!(split("/a/b/").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn reject_empty_segments() {
        assert!(matches!(split("a//b"), Err(TreeError::InvalidPath(_))));
        assert!(split("//a").is_err());
        assert!(split("a//").is_err());
        assert!(split("//").is_err());
    }

    #[test]
    fn reject_dot_segments_and_nul() {
        assert!(split("a/./b").is_err());
        assert!(split("../a").is_err());
        assert!(split("a/b\0c").is_err());
    }

    #[test]
    fn join_is_canonical() {
        assert_eq!(join(&["a", "b", "c"]), "a/b/c");
        assert_eq!(join(&[]), "");
    }

    proptest! {
        #[test]
        fn split_join_roundtrip(segments in prop::collection::vec("[a-zA-Z0-9_-][a-zA-Z0-9_.-]{0,8}", 1..6)) {
            let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
            let path = join(&segments);
            prop_assert_eq!(split(&path).unwrap(), segments.clone());
            let decorated = format!("/{path}/");
            prop_assert_eq!(split(&decorated).unwrap(), segments);
        }
    }
}
