//! Hook use cases: install, uninstall, run

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{check, MemoryService};
use crate::collab::Collaborators;
use crate::config::Config;
use crate::core::scope::Scope;
use crate::core::store::VersionedStore;
use crate::error::{MemError, Result};
use crate::hook::{self, CommitContext, HookPipeline, HookReport, InstallOptions, Strategy, POST_COMMIT};

impl MemoryService {
    /// Install the managed post-commit hook for the resolved scope
    pub fn install_hook(
        &self,
        hint: &str,
        strategy: Strategy,
        script: Option<PathBuf>,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        check(cancel)?;
        if strategy == Strategy::Script && script.is_none() {
            return Err(MemError::Config("the script strategy needs --script".into()));
        }

        let scope = self.scope(hint);
        if !scope.is_initialized() {
            return Err(MemError::NotInitialized(scope.store));
        }

        let opts = InstallOptions {
            scope_hint: hint.to_string(),
            strategy,
            script,
            force,
        };
        hook::install(&scope, &opts)
    }

    pub fn uninstall_hook(&self, hint: &str, keep_config: bool, cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        let scope = self.scope(hint);
        if !scope.is_initialized() {
            return Err(MemError::NotInitialized(scope.store));
        }
        hook::uninstall(&scope, keep_config)
    }

    /// Handle a hook invocation from the host repository
    ///
    /// The first scope in the cascade with the hook enabled governs the run;
    /// with none enabled this is a no-op. Strategy failures are reported in
    /// the returned [`HookReport`], never as errors.
    pub async fn run_hook(&self, hook_type: &str, cancel: &CancellationToken) -> Result<HookReport> {
        check(cancel)?;
        if hook_type != POST_COMMIT {
            debug!(hook_type, "unsupported hook type");
            return Ok(HookReport::default());
        }

        let Some((scope, config)) = self.hook_scope() else {
            debug!("no scope has the hook enabled");
            return Ok(HookReport::default());
        };

        let ctx = CommitContext::gather(&self.resolver.paths().cwd)?;
        let store = VersionedStore::open(&scope)?;
        let collabs = Collaborators::resolve(&scope, &config);
        let reindex = || self.request_hook_reindex(&scope);

        let report = HookPipeline::new(&config.hooks.post_commit, &store)
            .with_provider(&collabs.provider)
            .on_reindex(&reindex)
            .run_hook(hook_type, &ctx, cancel)
            .await;

        debug!(stored = report.stored.len(), warnings = report.warnings.len(), "hook finished");
        Ok(report)
    }

    fn hook_scope(&self) -> Option<(Scope, Config)> {
        for scope in self.resolver.cascade() {
            if !scope.is_initialized() {
                continue;
            }
            match Config::load_from(&scope.config_path()) {
                Ok(config) if config.hooks.post_commit.enabled => return Some((scope, config)),
                Ok(_) => {}
                Err(e) => warn!(scope = %scope, error = %e, "config unreadable, skipping scope"),
            }
        }
        None
    }
}
