//! Key - Memory addresses
//!
//! Keys are hierarchical, path-like identifiers. Each key maps 1:1 to a
//! relative file path under the working root of its scope.
//!
//! # Examples
//! - `notes/todo`
//! - `projects/alpha/api.md`
//! - `hooks/commits/1a2b3c4`
//!
//! # Key Points
//! - Must match `^[A-Za-z0-9][A-Za-z0-9._/-]*$`
//! - Empty, `.` and `..` segments are rejected, so a key never escapes its
//!   root and maps to exactly one path

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MemError, Result};

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("key pattern is a valid regex")
    })
}

/// A validated memory key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Parse and validate a key string
    ///
    /// # Examples
    /// ```
    /// use mem::core::key::Key;
    ///
    /// let key = Key::parse("notes/todo").unwrap();
    /// assert_eq!(key.segments().count(), 2);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || !key_pattern().is_match(s) {
            return Err(MemError::InvalidKey(s.to_string()));
        }

        if s.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(MemError::InvalidKey(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment (leaf name)
    pub fn name(&self) -> &str {
        self.segments().last().unwrap_or(&self.0)
    }

    /// Parent key, if the key has more than one segment
    pub fn parent(&self) -> Option<Key> {
        let trimmed = self.0.trim_end_matches('/');
        let (parent, _) = trimmed.rsplit_once('/')?;
        let parent = parent.trim_end_matches('/');
        if parent.is_empty() {
            return None;
        }
        Some(Key(parent.to_string()))
    }

    /// Literal string prefix match (not segment aware)
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Join a child path onto this key
    pub fn join(&self, child: &str) -> Result<Key> {
        let child = child.trim_start_matches('/');
        if child.is_empty() {
            return Ok(self.clone());
        }
        Key::parse(&format!("{}/{}", self.0.trim_end_matches('/'), child))
    }

    /// Relative filesystem path for this key
    pub fn to_rel_path(&self) -> PathBuf {
        self.segments().collect()
    }

    /// Key for a path relative to a working root, using `/` separators
    pub fn from_rel_path(rel: &std::path::Path) -> Result<Self> {
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Key::parse(&parts.join("/"))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Key {
    type Error = MemError;

    fn try_from(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = MemError;

    fn try_from(s: String) -> Result<Self> {
        Key::parse(&s)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let key = Key::parse("notes/alpha/todo").unwrap();
        assert_eq!(key.segments().collect::<Vec<_>>(), vec!["notes", "alpha", "todo"]);
        assert_eq!(key.as_str(), "notes/alpha/todo");
    }

    #[test]
    fn test_valid_characters() {
        assert!(Key::parse("a").is_ok());
        assert!(Key::parse("A1/b_c/d-e/f.md").is_ok());
        assert!(Key::parse("0day").is_ok());
    }

    #[test]
    fn test_empty_key_error() {
        assert!(matches!(Key::parse(""), Err(MemError::InvalidKey(_))));
    }

    #[test]
    fn test_invalid_first_character() {
        assert!(Key::parse("/abs").is_err());
        assert!(Key::parse(".hidden").is_err());
        assert!(Key::parse("-dash").is_err());
        assert!(Key::parse("_under").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(Key::parse("my key").is_err());
        assert!(Key::parse("a/b!c").is_err());
        assert!(Key::parse("a\\b").is_err());
        assert!(Key::parse("a/b\n").is_err());
    }

    #[test]
    fn test_dot_segments_rejected() {
        assert!(Key::parse("a/../b").is_err());
        assert!(Key::parse("a/./b").is_err());
        assert!(Key::parse("a/..").is_err());
        // dots inside a segment are fine
        assert!(Key::parse("a/..b").is_ok());
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(matches!(Key::parse("a//b"), Err(MemError::InvalidKey(_))));
        assert!(matches!(Key::parse("a/"), Err(MemError::InvalidKey(_))));
        assert!(Key::parse("a/b").is_ok());
    }

    #[test]
    fn test_name_and_parent() {
        let key = Key::parse("a/b/c").unwrap();
        assert_eq!(key.name(), "c");
        let parent = key.parent().unwrap();
        assert_eq!(parent.as_str(), "a/b");
        assert_eq!(parent.parent().unwrap().as_str(), "a");
        assert!(parent.parent().unwrap().parent().is_none());
    }

    #[test]
    fn test_literal_prefix_is_not_segment_aware() {
        let key = Key::parse("projectx/notes").unwrap();
        assert!(key.has_prefix("project"));
        assert!(key.has_prefix(""));
        assert!(!key.has_prefix("notes"));
    }

    #[test]
    fn test_join() {
        let key = Key::parse("hooks/commits").unwrap();
        assert_eq!(key.join("abc1234").unwrap().as_str(), "hooks/commits/abc1234");
        assert_eq!(key.join("").unwrap(), key);
        assert!(key.join("bad name").is_err());
    }

    #[test]
    fn test_rel_path_round_trip() {
        let key = Key::parse("a/b/c.txt").unwrap();
        let rel = key.to_rel_path();
        assert_eq!(Key::from_rel_path(&rel).unwrap(), key);
    }

    #[test]
    fn test_serde_validates() {
        let key: Key = serde_json::from_str("\"a/b\"").unwrap();
        assert_eq!(key.as_str(), "a/b");
        assert!(serde_json::from_str::<Key>("\"bad key\"").is_err());
    }
}
