//! Branches - named, movable pointers to commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::GitEngine;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Commit hash the branch points at
    pub head: String,
    /// Known only for branches created by this handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Current / list / create / switch / delete
pub struct BranchController<'a> {
    engine: &'a GitEngine,
}

impl<'a> BranchController<'a> {
    pub(crate) fn new(engine: &'a GitEngine) -> Self {
        Self { engine }
    }

    pub fn current(&self) -> Result<Branch> {
        self.engine.current_branch()
    }

    pub fn list(&self) -> Result<Vec<Branch>> {
        self.engine.branches()
    }

    /// New branch at HEAD. Does not switch.
    pub fn create(&self, name: &str) -> Result<Branch> {
        self.engine.create_branch(name)
    }

    /// Check out `name`. Uncommitted changes are not stashed.
    pub fn switch(&self, name: &str) -> Result<()> {
        self.engine.checkout_branch(name)
    }

    /// Fails when `name` is the current branch
    pub fn delete(&self, name: &str) -> Result<()> {
        self.engine.delete_branch(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::engine::DEFAULT_BRANCH;
    use crate::core::key::Key;
    use crate::core::scope::Scope;
    use crate::core::store::VersionedStore;
    use crate::error::MemError;
    use tempfile::TempDir;

    fn store() -> (TempDir, VersionedStore) {
        let tmp = TempDir::new().unwrap();
        let store = VersionedStore::init(&Scope::project(tmp.path().join("p"))).unwrap();
        (tmp, store)
    }

    #[test]
    fn test_current_is_default_branch() {
        let (_tmp, store) = store();
        let current = store.branches().current().unwrap();
        assert_eq!(current.name, DEFAULT_BRANCH);
        assert_eq!(current.head.len(), 40);
    }

    #[test]
    fn test_create_does_not_switch() {
        let (_tmp, store) = store();
        let created = store.branches().create("dev").unwrap();
        assert_eq!(created.name, "dev");
        assert!(created.created_at.is_some());
        assert_eq!(store.branches().current().unwrap().name, DEFAULT_BRANCH);

        let names: Vec<_> = store
            .branches()
            .list()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["dev".to_string(), "main".to_string()]);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let (_tmp, store) = store();
        store.branches().create("dev").unwrap();
        assert!(store.branches().create("dev").is_err());
    }

    #[test]
    fn test_switch_and_delete_current() {
        let (_tmp, store) = store();
        store.branches().create("dev").unwrap();
        store.branches().switch("dev").unwrap();
        assert_eq!(store.branches().current().unwrap().name, "dev");

        assert!(matches!(
            store.branches().delete("dev"),
            Err(MemError::CurrentBranch(_))
        ));
    }

    #[test]
    fn test_delete_non_current() {
        let (_tmp, store) = store();
        store.branches().create("dev").unwrap();
        store.branches().delete("dev").unwrap();
        assert!(store
            .branches()
            .list()
            .unwrap()
            .iter()
            .all(|b| b.name != "dev"));
    }

    #[test]
    fn test_delete_unknown_branch() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.branches().delete("ghost"),
            Err(MemError::NotFound(_))
        ));
        assert!(matches!(
            store.branches().switch("ghost"),
            Err(MemError::NotFound(_))
        ));
    }

    #[test]
    fn test_switch_replaces_working_tree() {
        let (_tmp, store) = store();
        let key = Key::parse("notes/x").unwrap();

        store.branches().create("dev").unwrap();
        store.save(&key, b"on main").unwrap();
        store.history().commit("main note").unwrap();

        store.branches().switch("dev").unwrap();
        assert!(!store.exists(&key).unwrap());

        store.branches().switch("main").unwrap();
        assert_eq!(store.get(&key).unwrap().content, b"on main");
    }
}
