//! Memory CRUD use cases

use std::fs;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{check, MemoryService};
use crate::collab::VectorIndex;
use crate::config::Config;
use crate::core::branch::Branch;
use crate::core::history::{Commit, StagedChange};
use crate::core::key::Key;
use crate::core::memory::Memory;
use crate::core::scope::{Scope, ScopeType};
use crate::core::store::VersionedStore;
use crate::error::{MemError, OpContext, Result};

/// Subdirectory of the store reserved for the vector index
const VECTORS_DIR: &str = "vectors";

/// Working state of one scope
#[derive(Debug)]
pub struct Status {
    pub scope: Scope,
    pub branch: Branch,
    pub staged: Vec<StagedChange>,
}

impl MemoryService {
    /// Create the store for a scope
    ///
    /// A project scope is rooted at the working directory.
    pub fn init(&self, kind: ScopeType, cancel: &CancellationToken) -> Result<Scope> {
        check(cancel)?;

        let scope = match kind {
            ScopeType::Global => self.resolver.global(),
            ScopeType::Project => {
                let scope = Scope::project(&self.resolver.paths().cwd);
                if scope.store == self.resolver.global().store {
                    return Err(MemError::Config(format!(
                        "{} is the global store; use --global",
                        scope.store.display()
                    )));
                }
                scope
            }
        };

        if scope.store.exists() {
            return Err(MemError::AlreadyInitialized(scope.store.clone()));
        }

        VersionedStore::init(&scope)?;
        fs::create_dir_all(scope.store.join(VECTORS_DIR)).op("create vectors directory")?;
        Config::default().save_to(&scope.config_path())?;

        info!(scope = %scope, "initialized");
        Ok(scope)
    }

    /// Write and stage a memory
    pub async fn set(
        &self,
        hint: &str,
        key: &Key,
        content: &[u8],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (scope, store) = self.open(hint, cancel)?;
        ensure_writable(&store, key)?;
        store.save(key, content)?;
        drop(store);

        self.index_memory(&scope, key, content).await;
        Ok(())
    }

    /// Read a memory
    ///
    /// With no scope hint the cascade is searched nearest first; uninitialized
    /// scopes are skipped.
    pub fn get(&self, hint: &str, key: &Key, cancel: &CancellationToken) -> Result<Memory> {
        if !hint.is_empty() {
            let (_, store) = self.open(hint, cancel)?;
            return store.get(key);
        }

        for scope in self.resolver.cascade() {
            check(cancel)?;
            let store = match VersionedStore::open(&scope) {
                Ok(store) => store,
                Err(MemError::NotInitialized(_)) => continue,
                Err(e) => return Err(e),
            };
            match store.get(key) {
                Ok(memory) => return Ok(memory),
                Err(e) if e.is_not_found() => {
                    debug!(key = %key, scope = %scope.kind, "not in scope, cascading");
                }
                Err(e) => return Err(e),
            }
        }

        Err(MemError::NotFound(key.to_string()))
    }

    /// Unstage and remove a memory
    pub async fn delete(&self, hint: &str, key: &Key, cancel: &CancellationToken) -> Result<()> {
        let (scope, store) = self.open(hint, cancel)?;
        store.delete(key)?;
        drop(store);

        let mut collabs = self.collaborators(&scope);
        if let Some(index) = collabs.index.degrade_mut() {
            if let Err(e) = index.remove(key).and_then(|()| index.save()) {
                warn!(key = %key, error = %e, "failed to update index after delete");
            }
        }
        Ok(())
    }

    pub fn list(&self, hint: &str, prefix: &str, cancel: &CancellationToken) -> Result<Vec<Memory>> {
        let (_, store) = self.open(hint, cancel)?;
        store.list(prefix)
    }

    /// Append to a memory (creating it if absent) and commit
    pub async fn add(
        &self,
        hint: &str,
        key: &Key,
        content: &str,
        message: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Commit> {
        let (scope, store) = self.open(hint, cancel)?;
        ensure_writable(&store, key)?;

        let mut merged = match store.get(key) {
            Ok(existing) => existing.content,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        if !merged.is_empty() {
            merged.push(b'\n');
        }
        merged.extend_from_slice(content.as_bytes());

        store.save(key, &merged)?;
        check(cancel)?;
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("add: append to {}", key));
        let commit = store.history().commit(&message)?;
        drop(store);

        self.index_memory(&scope, key, &merged).await;
        Ok(commit)
    }

    /// Overwrite a memory and commit
    pub async fn edit(
        &self,
        hint: &str,
        key: &Key,
        content: &[u8],
        message: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Commit> {
        let (scope, store) = self.open(hint, cancel)?;
        ensure_writable(&store, key)?;
        store.save(key, content)?;

        check(cancel)?;
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("edit: update {}", key));
        let commit = store.history().commit(&message)?;
        drop(store);

        self.index_memory(&scope, key, content).await;
        Ok(commit)
    }

    pub fn status(&self, hint: &str, cancel: &CancellationToken) -> Result<Status> {
        let (scope, store) = self.open(hint, cancel)?;
        let branch = store.branches().current()?;
        let staged = store.history().staged()?;
        Ok(Status {
            scope,
            branch,
            staged,
        })
    }

    /// `MEM_*` variables describing the resolved scope
    ///
    /// `MEM_BRANCH` is only present when the scope is initialized.
    pub fn scope_env(&self, hint: &str, cancel: &CancellationToken) -> Result<Vec<(&'static str, String)>> {
        check(cancel)?;
        let scope = self.scope(hint);

        let mut env = vec![
            ("MEM_SCOPE", scope.kind.to_string()),
            ("MEM_ROOT", scope.root.display().to_string()),
            ("MEM_SCOPE_PATH", scope.store.display().to_string()),
            ("MEM_CONFIG", scope.config_path().display().to_string()),
        ];
        if scope.is_initialized() {
            let branch = VersionedStore::open(&scope)?.branches().current()?;
            env.push(("MEM_BRANCH", branch.name));
        }
        Ok(env)
    }

    /// Embed and index one memory; every failure is logged and swallowed
    async fn index_memory(&self, scope: &Scope, key: &Key, content: &[u8]) {
        let mut collabs = self.collaborators(scope);
        let Some(embedder) = collabs.embedder.degrade() else {
            return;
        };

        let text = String::from_utf8_lossy(content);
        let vector = match embedder.embed(&text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "embedding failed, index not updated");
                return;
            }
        };

        if let Some(index) = collabs.index.degrade_mut() {
            if let Err(e) = index.add(key, vector).and_then(|()| index.save()) {
                warn!(key = %key, error = %e, "failed to update index");
            }
        }
    }
}

fn ensure_writable(store: &VersionedStore, key: &Key) -> Result<()> {
    if store.is_ignored(key) {
        return Err(MemError::Ignored(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    #[test]
    fn test_init_layout() {
        let fx = Fixture::bare();
        let scope = fx.service.init(ScopeType::Project, &fx.cancel).unwrap();

        assert_eq!(scope.root, fx.work);
        assert!(scope.sentinel_path().is_file());
        assert!(scope.store.join("vectors").is_dir());
        assert!(scope.config_path().is_file());
    }

    #[test]
    fn test_init_twice_fails() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.service.init(ScopeType::Project, &fx.cancel),
            Err(MemError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_init_global() {
        let fx = Fixture::bare();
        let scope = fx.service.init(ScopeType::Global, &fx.cancel).unwrap();
        assert_eq!(scope.kind, ScopeType::Global);
        assert_eq!(scope.store, fx.home.join(".mem"));
        assert!(scope.root.join(".mem-init").is_file());
    }

    #[test]
    fn test_project_init_in_home_is_rejected() {
        let fx = Fixture::bare();
        let service = MemoryService::new(crate::config::Paths::new(&fx.home, &fx.home));
        assert!(matches!(
            service.init(ScopeType::Project, &fx.cancel),
            Err(MemError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let fx = Fixture::new();
        let k = key("notes/today");

        fx.service.set("", &k, b"remember this", &fx.cancel).await.unwrap();
        let mem = fx.service.get("", &k, &fx.cancel).unwrap();
        assert_eq!(mem.content, b"remember this");

        fx.service.delete("", &k, &fx.cancel).await.unwrap();
        assert!(fx.service.get("", &k, &fx.cancel).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_cascades_to_global() {
        let fx = Fixture::new();
        fx.service.init(ScopeType::Global, &fx.cancel).unwrap();

        let k = key("shared/style");
        fx.service.set("global", &k, b"global value", &fx.cancel).await.unwrap();
        assert_eq!(fx.service.get("", &k, &fx.cancel).unwrap().content, b"global value");

        // A project entry shadows the global one
        fx.service.set("", &k, b"project value", &fx.cancel).await.unwrap();
        assert_eq!(fx.service.get("", &k, &fx.cancel).unwrap().content, b"project value");
        assert_eq!(
            fx.service.get("global", &k, &fx.cancel).unwrap().content,
            b"global value"
        );
    }

    #[test]
    fn test_get_skips_uninitialized_global() {
        let fx = Fixture::new();
        let err = fx.service.get("", &key("missing"), &fx.cancel).unwrap_err();
        assert!(matches!(err, MemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_appends_and_commits() {
        let fx = Fixture::new();
        let k = key("log/daily");

        let first = fx.service.add("", &k, "line one", None, &fx.cancel).await.unwrap();
        assert_eq!(first.message, "add: append to log/daily");

        fx.service.add("", &k, "line two", Some("more"), &fx.cancel).await.unwrap();
        let mem = fx.service.get("", &k, &fx.cancel).unwrap();
        assert_eq!(mem.text(), "line one\nline two");

        let log = fx.service.log("", 0, &fx.cancel).unwrap();
        assert_eq!(log[0].message, "more");
    }

    #[tokio::test]
    async fn test_edit_overwrites_and_commits() {
        let fx = Fixture::new();
        let k = key("todo");
        fx.service.set("", &k, b"old", &fx.cancel).await.unwrap();

        let commit = fx.service.edit("", &k, b"new", None, &fx.cancel).await.unwrap();
        assert_eq!(commit.message, "edit: update todo");
        assert_eq!(fx.service.get("", &k, &fx.cancel).unwrap().content, b"new");
        assert!(fx.service.status("", &fx.cancel).unwrap().staged.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_keys_are_rejected() {
        let fx = Fixture::new();
        std::fs::write(fx.work.join(".memignore"), "secrets/*\n").unwrap();

        let err = fx
            .service
            .set("", &key("secrets/token"), b"x", &fx.cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MemError::Ignored(_)));

        let err = fx
            .service
            .add("", &key("secrets/token"), "x", None, &fx.cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MemError::Ignored(_)));
    }

    #[tokio::test]
    async fn test_host_gitignore_does_not_block_writes() {
        let fx = Fixture::new();
        std::fs::write(fx.work.join(".gitignore"), "*.md\nbuild/\n").unwrap();

        fx.service
            .set("", &key("notes/plan.md"), b"plan", &fx.cancel)
            .await
            .unwrap();
        fx.service
            .add("", &key("build/log"), "ok", None, &fx.cancel)
            .await
            .unwrap();
        assert_eq!(
            fx.service.get("", &key("notes/plan.md"), &fx.cancel).unwrap().content,
            b"plan"
        );
    }

    #[test]
    fn test_scope_env() {
        let fx = Fixture::new();
        let env: std::collections::HashMap<_, _> =
            fx.service.scope_env("", &fx.cancel).unwrap().into_iter().collect();

        assert_eq!(env["MEM_SCOPE"], "project");
        assert_eq!(env["MEM_ROOT"], fx.work.display().to_string());
        assert_eq!(env["MEM_BRANCH"], "main");
        assert!(env["MEM_CONFIG"].ends_with("config.toml"));

        let global: std::collections::HashMap<_, _> =
            fx.service.scope_env("global", &fx.cancel).unwrap().into_iter().collect();
        assert_eq!(global["MEM_SCOPE"], "global");
        assert!(!global.contains_key("MEM_BRANCH"));
    }

    #[tokio::test]
    async fn test_status_lists_staged() {
        let fx = Fixture::new();
        fx.service.set("", &key("a"), b"1", &fx.cancel).await.unwrap();

        let status = fx.service.status("", &fx.cancel).unwrap();
        assert_eq!(status.branch.name, "main");
        assert_eq!(status.staged.len(), 1);
        assert_eq!(status.staged[0].path, "a");
    }
}
