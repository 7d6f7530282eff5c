//! Ignore rules - `.memignore` at the scope root
//!
//! Gitignore syntax. Only this one file counts: the host project's
//! `.gitignore`, `info/exclude` and global excludes never block a memory.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

use super::scope::Scope;
use crate::error::{MemError, Result};

/// Compiled `.memignore` patterns for one scope
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    /// Rules that ignore nothing
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// Read `<root>/.memignore`; a missing file ignores nothing
    ///
    /// Malformed lines are skipped with a warning.
    pub fn load(scope: &Scope) -> Result<Self> {
        let path = scope.ignore_path();
        if !path.is_file() {
            return Ok(Self::empty());
        }

        let mut builder = GitignoreBuilder::new(&scope.root);
        if let Some(e) = builder.add(&path) {
            warn!(path = %path.display(), error = %e, "skipping bad ignore patterns");
        }
        let matcher = builder
            .build()
            .map_err(|e| MemError::Config(format!("{}: {}", path.display(), e)))?;

        Ok(Self { matcher })
    }

    /// Whether `rel` (relative to the root) or one of its parent dirs matches
    pub fn is_ignored(&self, rel: &Path) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel, false)
            .is_ignore()
    }
}
