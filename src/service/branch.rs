//! Branch use cases

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::MemoryService;
use crate::core::branch::Branch;
use crate::error::Result;

impl MemoryService {
    pub fn current_branch(&self, hint: &str, cancel: &CancellationToken) -> Result<Branch> {
        let (_, store) = self.open(hint, cancel)?;
        store.branches().current()
    }

    pub fn branches(&self, hint: &str, cancel: &CancellationToken) -> Result<Vec<Branch>> {
        let (_, store) = self.open(hint, cancel)?;
        store.branches().list()
    }

    /// New branch at HEAD; stays on the current branch
    pub fn create_branch(&self, hint: &str, name: &str, cancel: &CancellationToken) -> Result<Branch> {
        let (_, store) = self.open(hint, cancel)?;
        let branch = store.branches().create(name)?;
        info!(branch = name, "created branch");
        Ok(branch)
    }

    pub fn switch_branch(&self, hint: &str, name: &str, cancel: &CancellationToken) -> Result<()> {
        let (_, store) = self.open(hint, cancel)?;
        store.branches().switch(name)?;
        info!(branch = name, "switched branch");
        Ok(())
    }

    pub fn delete_branch(&self, hint: &str, name: &str, cancel: &CancellationToken) -> Result<()> {
        let (_, store) = self.open(hint, cancel)?;
        store.branches().delete(name)?;
        info!(branch = name, "deleted branch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MemError;
    use crate::service::testing::Fixture;

    #[test]
    fn test_branch_lifecycle() {
        let fx = Fixture::new();
        let s = &fx.service;

        s.create_branch("", "dev", &fx.cancel).unwrap();
        assert_eq!(s.current_branch("", &fx.cancel).unwrap().name, "main");

        s.switch_branch("", "dev", &fx.cancel).unwrap();
        assert_eq!(s.current_branch("", &fx.cancel).unwrap().name, "dev");
        assert!(matches!(
            s.delete_branch("", "dev", &fx.cancel),
            Err(MemError::CurrentBranch(_))
        ));

        s.switch_branch("", "main", &fx.cancel).unwrap();
        s.delete_branch("", "dev", &fx.cancel).unwrap();
        let names: Vec<_> = s
            .branches("", &fx.cancel)
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["main"]);
    }
}
