//! Commit context - what the host repository just committed
//!
//! Built fresh for each hook invocation and never persisted as-is.

use std::path::Path;

use git2::{ErrorCode, Repository};
use serde::{Deserialize, Serialize};

use crate::core::engine::render_patch;
use crate::core::history::short_hash;
use crate::error::{MemError, OpContext, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitContext {
    /// Short (7-char) commit hash
    pub hash: String,
    /// Subject line of the commit message
    pub message: String,
    pub author: String,
    /// Unified diff of the commit against its first parent
    pub diff: String,
}

impl CommitContext {
    /// Read HEAD of the git repository containing `start`
    ///
    /// A root commit is diffed against the empty tree.
    pub fn gather(start: &Path) -> Result<Self> {
        let repo = discover(start)?;

        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .op("get HEAD commit")?;
        let tree = head.tree().op("get HEAD tree")?;
        let parent_tree = match head.parent(0) {
            Ok(parent) => Some(parent.tree().op("get parent tree")?),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e).op("get parent commit"),
        };

        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .op("diff commit")?;

        let hash = head.id().to_string();
        let author = head.author().name().unwrap_or("").to_string();
        let ctx = Self {
            hash: short_hash(&hash).to_string(),
            message: head.summary().unwrap_or("").trim().to_string(),
            author,
            diff: render_patch(&diff)?,
        };
        Ok(ctx)
    }
}

/// Host git repository enclosing `start`
pub(crate) fn discover(start: &Path) -> Result<Repository> {
    match Repository::discover(start) {
        Ok(repo) => Ok(repo),
        Err(e) if e.code() == ErrorCode::NotFound => {
            Err(MemError::NotAGitRepository(start.to_path_buf()))
        }
        Err(e) => Err(e).op("discover git repository"),
    }
}
