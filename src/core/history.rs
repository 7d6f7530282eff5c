//! History - commit, log, diff and revert over a scope's store
//!
//! Staging happens in [`super::store::VersionedStore`]; this controller turns
//! whatever is staged into history and reads history back.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::GitEngine;
use crate::error::{MemError, Result};

/// An immutable snapshot of staged changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub parents: Vec<String>,
}

impl Commit {
    /// First 7 characters of the hash
    pub fn short_hash(&self) -> &str {
        short_hash(&self.hash)
    }
}

/// First 7 characters of a hash (or the whole hash if shorter)
pub fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(7) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// One staged path and how it differs from HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// Commit / log / diff / revert
pub struct HistoryController<'a> {
    engine: &'a GitEngine,
}

impl<'a> HistoryController<'a> {
    pub(crate) fn new(engine: &'a GitEngine) -> Self {
        Self { engine }
    }

    /// Commit everything staged; fails with `NothingToCommit` when nothing is
    pub fn commit(&self, message: &str) -> Result<Commit> {
        self.engine.commit(message)
    }

    /// Newest first from the current branch head; `limit <= 0` is unbounded
    pub fn log(&self, limit: i64) -> Result<Vec<Commit>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        self.engine.log(limit)
    }

    /// Diff against HEAD (`reference == ""`) or against a resolved revision
    pub fn diff(&self, reference: &str) -> Result<String> {
        if reference.is_empty() {
            return self.pseudo_diff();
        }
        let target = self.engine.resolve(reference)?;
        self.engine.diff_to_head(target)
    }

    /// Resolve a revision to its commit
    pub fn show(&self, reference: &str) -> Result<Commit> {
        let oid = self.engine.resolve(reference)?;
        self.engine.find_commit(oid)
    }

    /// Hard-reset branch and working tree to `reference`
    pub fn revert(&self, reference: &str) -> Result<()> {
        if reference.is_empty() {
            return Err(MemError::NotFound("revision \"\"".to_string()));
        }
        let oid = self.engine.resolve(reference)?;
        self.engine.reset_hard(oid)
    }

    pub fn staged(&self) -> Result<Vec<StagedChange>> {
        self.engine.staged_changes()
    }

    /// Staged state vs HEAD rendered as whole-file old/new blocks.
    ///
    /// Every line of the old content is removed and every line of the new
    /// content is added; this is not a minimal diff.
    fn pseudo_diff(&self) -> Result<String> {
        let changes = self.engine.staged_changes()?;
        let mut buf = String::new();

        for change in changes {
            let rel = Path::new(&change.path);
            match change.kind {
                ChangeKind::Added => {
                    let Ok(new) = std::fs::read(self.engine.root().join(rel)) else {
                        continue;
                    };
                    let _ = writeln!(buf, "--- /dev/null\n+++ b/{}", change.path);
                    push_lines(&mut buf, '+', &new);
                }
                ChangeKind::Modified => {
                    let Some(old) = self.engine.head_blob(rel)? else {
                        continue;
                    };
                    let Ok(new) = std::fs::read(self.engine.root().join(rel)) else {
                        continue;
                    };
                    let _ = writeln!(buf, "--- a/{}\n+++ b/{}", change.path, change.path);
                    push_lines(&mut buf, '-', &old);
                    push_lines(&mut buf, '+', &new);
                }
                ChangeKind::Deleted => {
                    let Some(old) = self.engine.head_blob(rel)? else {
                        continue;
                    };
                    let _ = writeln!(buf, "--- a/{}\n+++ /dev/null", change.path);
                    push_lines(&mut buf, '-', &old);
                }
            }
        }

        Ok(buf)
    }
}

fn push_lines(buf: &mut String, marker: char, content: &[u8]) {
    for line in String::from_utf8_lossy(content).split('\n') {
        buf.push(marker);
        buf.push_str(line);
        buf.push('\n');
    }
}
