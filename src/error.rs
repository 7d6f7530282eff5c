//! Error taxonomy for the store, history, branch and hook layers.
//!
//! The CLI wraps these in `anyhow` for context; the core keeps them typed so
//! cascading reads can tell "absent" apart from a hard failure.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, MemError>;

#[derive(Debug, Error)]
pub enum MemError {
    /// Key, branch or revision does not exist
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("key {0:?} is blocked by .memignore")]
    Ignored(String),

    #[error("no vector index available")]
    NoIndex,

    #[error("no embedder available")]
    NoEmbedder,

    #[error("no provider available")]
    NoProvider,

    #[error("nothing staged to commit")]
    NothingToCommit,

    #[error("cannot delete current branch {0:?}")]
    CurrentBranch(String),

    #[error("hook already exists at {} (use --force to overwrite)", .0.display())]
    HookConflict(PathBuf),

    #[error("hook at {} is not managed by mem", .0.display())]
    UnmanagedHook(PathBuf),

    #[error("repository not initialized: {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("not a git repository (searched from {})", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{op}: {source}")]
    Engine {
        op: &'static str,
        #[source]
        source: git2::Error,
    },

    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Collaborator(String),
}

impl MemError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemError::NotFound(_))
    }
}

/// Attach an operation label to engine and io failures
pub(crate) trait OpContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> OpContext<T> for std::result::Result<T, git2::Error> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| MemError::Engine { op, source })
    }
}

impl<T> OpContext<T> for std::result::Result<T, std::io::Error> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| MemError::Io { op, source })
    }
}
