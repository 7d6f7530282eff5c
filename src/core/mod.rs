//! Core module - Versioned storage
//!
//! Keys, scopes and the git-backed store with its history and branch
//! controllers.

pub mod branch;
pub mod engine;
pub mod history;
pub mod key;
pub mod memignore;
pub mod memory;
pub mod scope;
pub mod store;

pub use branch::{Branch, BranchController};
pub use history::{ChangeKind, Commit, HistoryController, StagedChange};
pub use key::Key;
pub use memory::{Memory, Metadata};
pub use scope::{Scope, ScopeResolver, ScopeType};
pub use store::VersionedStore;
