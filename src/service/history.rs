//! History use cases

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::MemoryService;
use crate::core::history::Commit;
use crate::error::Result;

impl MemoryService {
    /// Commit everything staged in the resolved scope
    pub fn commit(&self, hint: &str, message: &str, cancel: &CancellationToken) -> Result<Commit> {
        let (_, store) = self.open(hint, cancel)?;
        let commit = store.history().commit(message)?;
        info!(hash = commit.short_hash(), "committed");
        Ok(commit)
    }

    /// `limit <= 0` is unbounded
    pub fn log(&self, hint: &str, limit: i64, cancel: &CancellationToken) -> Result<Vec<Commit>> {
        let (_, store) = self.open(hint, cancel)?;
        store.history().log(limit)
    }

    pub fn diff(&self, hint: &str, reference: &str, cancel: &CancellationToken) -> Result<String> {
        let (_, store) = self.open(hint, cancel)?;
        store.history().diff(reference)
    }

    pub fn show(&self, hint: &str, reference: &str, cancel: &CancellationToken) -> Result<Commit> {
        let (_, store) = self.open(hint, cancel)?;
        store.history().show(reference)
    }

    /// Hard reset to `reference`; uncommitted work is discarded
    pub fn revert(&self, hint: &str, reference: &str, cancel: &CancellationToken) -> Result<()> {
        let (_, store) = self.open(hint, cancel)?;
        store.history().revert(reference)?;
        info!(reference, "reverted");
        Ok(())
    }
}
