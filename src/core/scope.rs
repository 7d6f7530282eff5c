//! Scope - Which physical store governs an operation
//!
//! A scope pairs a working root (where keys live as files) with a store path
//! (where version-control metadata, config and vectors live). The two are
//! deliberately separate so the metadata directory is never tracked inside
//! its own working tree.
//!
//! # Layout
//! - project: root = directory containing `.mem/`, store = `<root>/.mem`
//! - global: root = `~/.memories`, store = `~/.mem`
//!
//! Reads cascade project → global so project entries shadow global ones.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Paths;
use crate::error::MemError;

/// Name of the metadata directory inside a scope root
pub const STORE_DIR: &str = ".mem";

/// Working root of the global scope, relative to home
pub const GLOBAL_ROOT_DIR: &str = ".memories";

/// Sentinel file marking store initialization; never surfaced as a memory
pub const SENTINEL_FILE: &str = ".mem-init";

/// Ignore file consulted before writes
pub const IGNORE_FILE: &str = ".memignore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Project,
    Global,
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeType::Project => write!(f, "project"),
            ScopeType::Global => write!(f, "global"),
        }
    }
}

impl FromStr for ScopeType {
    type Err = MemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(ScopeType::Project),
            "global" => Ok(ScopeType::Global),
            _ => Err(MemError::Config(format!("unknown scope: {}", s))),
        }
    }
}

/// A resolved store location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub kind: ScopeType,
    /// Tracked working tree
    pub root: PathBuf,
    /// Version-control metadata, config and vectors
    pub store: PathBuf,
}

impl Scope {
    /// Project scope rooted at `root`
    pub fn project(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = root.join(STORE_DIR);
        Self {
            kind: ScopeType::Project,
            root,
            store,
        }
    }

    pub fn vector_path(&self) -> PathBuf {
        self.store.join("vectors")
    }

    pub fn config_path(&self) -> PathBuf {
        self.store.join("config.toml")
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.root.join(SENTINEL_FILE)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.root.join(IGNORE_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_dir()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.store.display())
    }
}

/// Decides which scope governs an operation
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    paths: Paths,
}

impl ScopeResolver {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// The user-global scope under the home directory
    pub fn global(&self) -> Scope {
        Scope {
            kind: ScopeType::Global,
            root: self.paths.home.join(GLOBAL_ROOT_DIR),
            store: self.paths.home.join(STORE_DIR),
        }
    }

    /// Nearest project scope, walking upward from the working directory
    pub fn project(&self) -> Option<Scope> {
        self.find_project_from(&self.paths.cwd)
    }

    fn find_project_from(&self, start: &Path) -> Option<Scope> {
        let global_store = self.global().store;
        let mut current = start.to_path_buf();

        loop {
            let store = current.join(STORE_DIR);
            // The global store lives at ~/.mem and must not pose as a project
            if store.is_dir() && store != global_store {
                debug!(root = %current.display(), "found project scope");
                return Some(Scope::project(current));
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// `"global"` wins outright; otherwise the project scope if any, else global
    pub fn resolve(&self, hint: &str) -> Scope {
        if hint == "global" {
            return self.global();
        }
        self.project().unwrap_or_else(|| self.global())
    }

    /// Scopes to search for reads, nearest first
    pub fn cascade(&self) -> Vec<Scope> {
        let mut scopes = Vec::with_capacity(2);
        if let Some(project) = self.project() {
            scopes.push(project);
        }
        scopes.push(self.global());
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let work = tmp.path().join("work");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(&work).unwrap();
        (tmp, home, work)
    }

    #[test]
    fn test_global_layout() {
        let (_tmp, home, work) = setup();
        let resolver = ScopeResolver::new(Paths::new(&home, &work));
        let global = resolver.global();
        assert_eq!(global.kind, ScopeType::Global);
        assert_eq!(global.store, home.join(".mem"));
        assert_eq!(global.root, home.join(".memories"));
        assert_eq!(global.vector_path(), home.join(".mem").join("vectors"));
        assert_eq!(global.config_path(), home.join(".mem").join("config.toml"));
    }

    #[test]
    fn test_project_not_found() {
        let (_tmp, home, work) = setup();
        let resolver = ScopeResolver::new(Paths::new(&home, &work));
        assert!(resolver.project().is_none());
        assert_eq!(resolver.resolve("").kind, ScopeType::Global);
        assert_eq!(resolver.cascade(), vec![resolver.global()]);
    }

    #[test]
    fn test_project_found_walking_up() {
        let (_tmp, home, work) = setup();
        std::fs::create_dir_all(work.join(".mem")).unwrap();
        let nested = work.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let resolver = ScopeResolver::new(Paths::new(&home, &nested));
        let project = resolver.project().unwrap();
        assert_eq!(project.kind, ScopeType::Project);
        assert_eq!(project.root, work);
        assert_eq!(project.store, work.join(".mem"));
    }

    #[test]
    fn test_store_file_is_not_a_project() {
        let (_tmp, home, work) = setup();
        std::fs::write(work.join(".mem"), "not a dir").unwrap();
        let resolver = ScopeResolver::new(Paths::new(&home, &work));
        assert!(resolver.project().is_none());
    }

    #[test]
    fn test_resolve_global_hint_wins() {
        let (_tmp, home, work) = setup();
        std::fs::create_dir_all(work.join(".mem")).unwrap();
        let resolver = ScopeResolver::new(Paths::new(&home, &work));

        assert_eq!(resolver.resolve("global").kind, ScopeType::Global);
        assert_eq!(resolver.resolve("").kind, ScopeType::Project);
        assert_eq!(resolver.resolve("project").kind, ScopeType::Project);
    }

    #[test]
    fn test_cascade_order() {
        let (_tmp, home, work) = setup();
        std::fs::create_dir_all(work.join(".mem")).unwrap();
        let resolver = ScopeResolver::new(Paths::new(&home, &work));

        let kinds: Vec<_> = resolver.cascade().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ScopeType::Project, ScopeType::Global]);
    }

    #[test]
    fn test_global_store_is_not_a_project() {
        let (_tmp, home, _work) = setup();
        std::fs::create_dir_all(home.join(".mem")).unwrap();
        let inside_home = home.join("code");
        std::fs::create_dir_all(&inside_home).unwrap();

        let resolver = ScopeResolver::new(Paths::new(&home, &inside_home));
        assert!(resolver.project().is_none());
        assert_eq!(resolver.cascade().len(), 1);
    }

    #[test]
    fn test_scope_type_parse() {
        assert_eq!("Global".parse::<ScopeType>().unwrap(), ScopeType::Global);
        assert_eq!("project".parse::<ScopeType>().unwrap(), ScopeType::Project);
        assert!("team".parse::<ScopeType>().is_err());
    }
}
