//! Service layer - use cases behind the CLI
//!
//! [`MemoryService`] wires scope resolution, the versioned store and the
//! optional collaborators together. It owns no storage logic itself.
//!
//! Every operation takes a [`CancellationToken`], checked before each
//! blocking store or engine call. A call already in flight runs to completion.

mod assist;
mod branch;
mod history;
mod hook;
mod memory;
mod provider;
mod search;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::collab::{Collaborators, ReindexQueue};
use crate::config::{Config, Paths};
use crate::core::scope::{Scope, ScopeResolver};
use crate::core::store::VersionedStore;
use crate::error::{MemError, Result};

pub use memory::Status;
pub use provider::ProviderEntry;
pub use search::IndexRebuild;

/// Application service over all scopes
pub struct MemoryService {
    resolver: ScopeResolver,
    reindex: ReindexQueue,
    /// Binary that runs hook-triggered rebuilds as a detached `index` process
    reindex_exe: Option<PathBuf>,
}

impl MemoryService {
    pub fn new(paths: Paths) -> Self {
        Self {
            resolver: ScopeResolver::new(paths),
            reindex: ReindexQueue::new(),
            reindex_exe: None,
        }
    }

    /// Run rebuilds requested by the hook as `<exe> index` in the background
    ///
    /// The hook process then exits without waiting for the rebuild. Without
    /// this the in-process [`ReindexQueue`] is used.
    pub fn with_detached_reindex(mut self, exe: PathBuf) -> Self {
        self.reindex_exe = Some(exe);
        self
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Background reindex queue; drain it before process exit
    pub fn reindex_queue(&self) -> &ReindexQueue {
        &self.reindex
    }

    /// Scope for `hint` (`""`, `"project"` or `"global"`)
    pub fn scope(&self, hint: &str) -> Scope {
        self.resolver.resolve(hint)
    }

    fn open(&self, hint: &str, cancel: &CancellationToken) -> Result<(Scope, VersionedStore)> {
        check(cancel)?;
        let scope = self.scope(hint);
        let store = VersionedStore::open(&scope)?;
        Ok((scope, store))
    }

    /// The scope's config; the scope must be initialized
    fn config(&self, scope: &Scope) -> Result<Config> {
        if !scope.is_initialized() {
            return Err(MemError::NotInitialized(scope.store.clone()));
        }
        Config::load_from(&scope.config_path())
    }

    /// Collaborators for `scope`; an unreadable config disables them all
    fn collaborators(&self, scope: &Scope) -> Collaborators {
        match Config::load_from(&scope.config_path()) {
            Ok(config) => Collaborators::resolve(scope, &config),
            Err(e) => {
                warn!(error = %e, "config unreadable, collaborators disabled");
                Collaborators::none()
            }
        }
    }
}

/// Fail fast when the caller has given up
pub(crate) fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(MemError::Cancelled);
    }
    Ok(())
}
