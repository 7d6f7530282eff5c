//! Storage - versioned key-value store over a git working tree
//!
//! # Key Points
//! - One memory = one file at `<root>/<key>`; its bytes are the content
//! - `save` writes and stages, it never commits
//! - `delete` unstages and removes the file
//! - No locking: concurrent writers to the same key race on the filesystem

use std::fs;
use std::io::ErrorKind;

use tracing::debug;
use walkdir::WalkDir;

use super::branch::BranchController;
use super::engine::GitEngine;
use super::history::HistoryController;
use super::key::Key;
use super::memignore::IgnoreRules;
use super::memory::Memory;
use super::scope::{Scope, SENTINEL_FILE, STORE_DIR};
use crate::error::{MemError, OpContext, Result};

/// Host repository metadata that may sit in a project root
const HOST_GIT_DIR: &str = ".git";

/// CRUD over memories in one scope
pub struct VersionedStore {
    engine: GitEngine,
    scope: Scope,
    ignore: IgnoreRules,
}

impl VersionedStore {
    /// Initialize a fresh store for `scope`
    pub fn init(scope: &Scope) -> Result<Self> {
        let engine = GitEngine::init(scope)?;
        Ok(Self {
            engine,
            scope: scope.clone(),
            ignore: IgnoreRules::load(scope)?,
        })
    }

    /// Open the store of an initialized scope
    pub fn open(scope: &Scope) -> Result<Self> {
        let engine = GitEngine::open(scope)?;
        Ok(Self {
            engine,
            scope: scope.clone(),
            ignore: IgnoreRules::load(scope)?,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn history(&self) -> HistoryController<'_> {
        HistoryController::new(&self.engine)
    }

    pub fn branches(&self) -> BranchController<'_> {
        BranchController::new(&self.engine)
    }

    /// Read a memory; an absent file is `NotFound`
    pub fn get(&self, key: &Key) -> Result<Memory> {
        let path = self.scope.root.join(key.to_rel_path());

        let info = match fs::metadata(&path) {
            Ok(info) if info.is_file() => info,
            Ok(_) => return Err(MemError::NotFound(key.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MemError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e).op("stat file"),
        };

        let content = fs::read(&path).op("read file")?;
        Ok(Memory::from_file(key.clone(), content, &info))
    }

    /// Write and stage; does not commit
    pub fn save(&self, key: &Key, content: &[u8]) -> Result<()> {
        let rel = key.to_rel_path();
        let path = self.scope.root.join(&rel);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).op("create directory")?;
        }
        fs::write(&path, content).op("write file")?;
        self.engine.stage(&rel)?;

        debug!(key = %key, bytes = content.len(), "saved memory");
        Ok(())
    }

    /// Unstage and remove; absent is `NotFound`
    pub fn delete(&self, key: &Key) -> Result<()> {
        if !self.exists(key)? {
            return Err(MemError::NotFound(key.to_string()));
        }
        self.engine.remove(&key.to_rel_path())?;

        debug!(key = %key, "deleted memory");
        Ok(())
    }

    /// Every memory whose key has `prefix` as a literal string prefix
    ///
    /// The match is not segment aware: `"project"` also matches `"projectx/a"`.
    pub fn list(&self, prefix: &str) -> Result<Vec<Memory>> {
        let mut memories = Vec::new();

        let walker = WalkDir::new(&self.scope.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && e.depth() > 0
                    && (e.file_name() == STORE_DIR || e.file_name() == HOST_GIT_DIR))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => continue,
                Err(e) => {
                    return Err(MemError::Io {
                        op: "walk directory",
                        source: e.into(),
                    })
                }
            };

            if !entry.file_type().is_file() || entry.file_name() == SENTINEL_FILE {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.scope.root) else {
                continue;
            };
            let Ok(key) = Key::from_rel_path(rel) else {
                continue;
            };
            if !key.has_prefix(prefix) {
                continue;
            }

            let info = entry.metadata().map_err(|e| MemError::Io {
                op: "stat file",
                source: e.into(),
            })?;
            let content = fs::read(entry.path()).op("read file")?;
            memories.push(Memory::from_file(key, content, &info));
        }

        Ok(memories)
    }

    pub fn exists(&self, key: &Key) -> Result<bool> {
        let path = self.scope.root.join(key.to_rel_path());
        match fs::metadata(&path) {
            Ok(info) => Ok(info.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).op("stat file"),
        }
    }

    /// Whether `.memignore` blocks writes to `key`
    pub fn is_ignored(&self, key: &Key) -> bool {
        self.ignore.is_ignored(&key.to_rel_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, VersionedStore) {
        let tmp = TempDir::new().unwrap();
        let store = VersionedStore::init(&Scope::project(tmp.path().join("p"))).unwrap();
        (tmp, store)
    }

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    fn keys(memories: &[Memory]) -> Vec<String> {
        memories.iter().map(|m| m.key.to_string()).collect()
    }

    #[test]
    fn test_save_then_get() {
        let (_tmp, store) = store();
        let k = key("notes/deep/item.md");
        store.save(&k, b"# content\n").unwrap();

        let mem = store.get(&k).unwrap();
        assert_eq!(mem.content, b"# content\n");
        assert_eq!(mem.metadata.mime_type, "text/markdown");
        assert!(store.exists(&k).unwrap());
    }

    #[test]
    fn test_binary_content_round_trips() {
        let (_tmp, store) = store();
        let bytes = vec![0u8, 159, 146, 150, 255];
        store.save(&key("blob"), &bytes).unwrap();
        assert_eq!(store.get(&key("blob")).unwrap().content, bytes);
    }

    #[test]
    fn test_save_overwrites() {
        let (_tmp, store) = store();
        store.save(&key("k"), b"one").unwrap();
        store.save(&key("k"), b"two").unwrap();
        assert_eq!(store.get(&key("k")).unwrap().content, b"two");
    }

    #[test]
    fn test_get_missing() {
        let (_tmp, store) = store();
        assert!(matches!(store.get(&key("missing")), Err(MemError::NotFound(_))));
        assert!(!store.exists(&key("missing")).unwrap());
    }

    #[test]
    fn test_get_directory_is_not_found() {
        let (_tmp, store) = store();
        store.save(&key("dir/file"), b"x").unwrap();
        assert!(matches!(store.get(&key("dir")), Err(MemError::NotFound(_))));
        assert!(!store.exists(&key("dir")).unwrap());
    }

    #[test]
    fn test_delete() {
        let (_tmp, store) = store();
        let k = key("a/b");
        store.save(&k, b"v").unwrap();
        store.delete(&k).unwrap();
        assert!(!store.exists(&k).unwrap());
        assert!(matches!(store.get(&k), Err(MemError::NotFound(_))));
    }

    #[test]
    fn test_delete_missing() {
        let (_tmp, store) = store();
        assert!(matches!(store.delete(&key("nope")), Err(MemError::NotFound(_))));
    }

    #[test]
    fn test_list_all_skips_sentinel_and_store() {
        let (_tmp, store) = store();
        store.save(&key("b"), b"2").unwrap();
        store.save(&key("a/x"), b"1").unwrap();

        let all = store.list("").unwrap();
        assert_eq!(keys(&all), vec!["a/x", "b"]);
    }

    #[test]
    fn test_list_prefix_is_literal() {
        let (_tmp, store) = store();
        store.save(&key("project/a"), b"1").unwrap();
        store.save(&key("projectx/b"), b"2").unwrap();
        store.save(&key("other/c"), b"3").unwrap();

        assert_eq!(keys(&store.list("project").unwrap()), vec!["project/a", "projectx/b"]);
        assert_eq!(keys(&store.list("project/").unwrap()), vec!["project/a"]);
        assert!(store.list("zzz").unwrap().is_empty());
    }

    #[test]
    fn test_list_reads_content() {
        let (_tmp, store) = store();
        store.save(&key("n"), b"hello").unwrap();
        let listed = store.list("n").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, b"hello");
    }

    #[test]
    fn test_list_skips_host_git_dir() {
        let (_tmp, store) = store();
        let git = store.scope().root.join(".git");
        fs::create_dir_all(&git).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        store.save(&key("visible"), b"1").unwrap();

        assert_eq!(keys(&store.list("").unwrap()), vec!["visible"]);
    }

    #[test]
    fn test_open_existing() {
        let (_tmp, store) = store();
        store.save(&key("k"), b"v").unwrap();
        store.history().commit("c").unwrap();

        let reopened = VersionedStore::open(store.scope()).unwrap();
        assert_eq!(reopened.get(&key("k")).unwrap().content, b"v");
    }

    #[test]
    fn test_end_to_end_history() {
        let (_tmp, store) = store();
        let k = key("a/b");

        store.save(&k, b"v1").unwrap();
        store.history().commit("m1").unwrap();
        store.save(&k, b"v2").unwrap();
        store.history().commit("m2").unwrap();

        assert_eq!(store.get(&k).unwrap().content, b"v2");

        let messages: Vec<_> = store
            .history()
            .log(10)
            .unwrap()
            .into_iter()
            .map(|c| c.message)
            .collect();
        let m1 = messages.iter().position(|m| m == "m1").unwrap();
        let m2 = messages.iter().position(|m| m == "m2").unwrap();
        assert!(m2 < m1);
    }

    #[test]
    fn test_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let scope = Scope::project(tmp.path().join("p"));
        VersionedStore::init(&scope).unwrap();
        fs::write(scope.ignore_path(), "secret\n").unwrap();

        let store = VersionedStore::open(&scope).unwrap();
        assert!(store.is_ignored(&key("secret")));
        assert!(!store.is_ignored(&key("public")));
    }

    #[test]
    fn test_host_gitignore_does_not_block_memories() {
        let tmp = TempDir::new().unwrap();
        let scope = Scope::project(tmp.path().join("p"));
        VersionedStore::init(&scope).unwrap();
        fs::write(scope.root.join(".gitignore"), "*.md\nbuild/\n").unwrap();

        let store = VersionedStore::open(&scope).unwrap();
        assert!(!store.is_ignored(&key("notes/plan.md")));
        assert!(!store.is_ignored(&key("build/log")));

        store.save(&key("notes/plan.md"), b"plan").unwrap();
        assert_eq!(store.get(&key("notes/plan.md")).unwrap().content, b"plan");
    }
}
