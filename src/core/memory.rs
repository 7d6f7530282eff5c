//! Memory - Core data structure
//!
//! A memory is one value stored under a key. It is persisted as exactly one
//! file whose bytes equal `content`; a memory exists iff its file exists.
//!
//! # Key Properties
//! - **key**: Validated path-like address
//! - **content**: Raw bytes, usually UTF-8 text
//! - **created_at / updated_at**: Derived from filesystem metadata, never stored

use std::fs::Metadata as FsMetadata;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::Key;

/// Descriptive metadata attached to a memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub mime_type: String,
}

/// A memory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub key: Key,

    pub content: Vec<u8>,

    #[serde(default)]
    pub metadata: Metadata,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Memory {
    /// Create a new in-memory entry stamped with the current time
    pub fn new(key: Key, content: impl Into<Vec<u8>>) -> Self {
        let now = Utc::now();
        let content = content.into();
        let metadata = Metadata {
            tags: Vec::new(),
            mime_type: guess_mime_type(&key, &content).to_string(),
        };
        Self {
            key,
            content,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a memory from file bytes and their stat metadata
    pub(crate) fn from_file(key: Key, content: Vec<u8>, info: &FsMetadata) -> Self {
        let modified: DateTime<Utc> = info
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let created: DateTime<Utc> = info
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified);

        let metadata = Metadata {
            tags: Vec::new(),
            mime_type: guess_mime_type(&key, &content).to_string(),
        };

        Self {
            key,
            content,
            metadata,
            created_at: created,
            updated_at: modified,
        }
    }

    /// Content as text (lossy for non-UTF-8 bytes)
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Number of content bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Best-effort MIME type from the key's extension and the content bytes
pub fn guess_mime_type(key: &Key, content: &[u8]) -> &'static str {
    let ext = key
        .name()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("toml") => "application/toml",
        Some("yaml" | "yml") => "application/yaml",
        Some("html" | "htm") => "text/html",
        _ if std::str::from_utf8(content).is_ok() => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_memory() {
        let key = Key::parse("notes/todo").unwrap();
        let mem = Memory::new(key.clone(), "buy milk");
        assert_eq!(mem.key, key);
        assert_eq!(mem.text(), "buy milk");
        assert_eq!(mem.size(), 8);
        assert_eq!(mem.created_at, mem.updated_at);
        assert_eq!(mem.metadata.mime_type, "text/plain");
    }

    #[test]
    fn test_mime_by_extension() {
        let key = Key::parse("docs/readme.md").unwrap();
        assert_eq!(guess_mime_type(&key, b"# hi"), "text/markdown");

        let key = Key::parse("cfg/app.YML").unwrap();
        assert_eq!(guess_mime_type(&key, b"a: 1"), "application/yaml");
    }

    #[test]
    fn test_mime_binary() {
        let key = Key::parse("blob").unwrap();
        assert_eq!(guess_mime_type(&key, &[0xff, 0xfe, 0x00]), "application/octet-stream");
    }
}
