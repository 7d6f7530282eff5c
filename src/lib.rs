//! mem - versioned key-value memory store
//!
//! Git for notes you want to keep. Every memory is a file under a scope's
//! root; history, branches and diffs come from a git repository kept apart
//! from the files it tracks.
//!
//! ## Key Concepts
//!
//! - **Scopes**: a project store (`.mem` next to your code) and a global one
//!   under the home directory; reads cascade project → global
//! - **Staging**: writes are staged, `commit` turns them into history
//! - **Hooks**: a git post-commit hook derives memories from each commit's diff
//! - **Collaborators**: embedder, vector index and LLM provider are optional;
//!   features that need one degrade or fail cleanly without it

pub mod cli;
pub mod collab;
pub mod config;
pub mod core;
pub mod error;
pub mod hook;
pub mod service;

pub use crate::core::{Branch, Commit, Key, Memory, Scope, ScopeResolver, ScopeType, VersionedStore};
pub use error::{MemError, Result};
pub use hook::{CommitContext, HookPipeline, HookReport, Strategy};
pub use service::MemoryService;
