//! Provider-backed use cases: summarize and auto-tag

use std::fmt::Write as _;

use tokio_util::sync::CancellationToken;

use super::{check, MemoryService};
use crate::collab::provider::generate;
use crate::collab::{AutoTag, Provider, Summary};
use crate::core::key::Key;
use crate::core::memory::Memory;
use crate::error::{MemError, Result};

impl MemoryService {
    /// Summarize every memory under `prefix`
    pub async fn summarize(
        &self,
        hint: &str,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<Summary> {
        let (scope, store) = self.open(hint, cancel)?;
        let collabs = self.collaborators(&scope);
        let provider = collabs.provider.require(MemError::NoProvider)?;

        let memories = store.list(prefix)?;
        drop(store);
        check(cancel)?;
        summarize_memories(provider.as_ref(), &memories).await
    }

    /// Suggest tags for one memory
    pub async fn autotag(&self, hint: &str, key: &Key, cancel: &CancellationToken) -> Result<AutoTag> {
        let (scope, store) = self.open(hint, cancel)?;
        let collabs = self.collaborators(&scope);
        let provider = collabs.provider.require(MemError::NoProvider)?;

        let memory = store.get(key)?;
        drop(store);
        check(cancel)?;
        let prompt = format!("Generate tags for this content:\n\n{}", memory.text());
        generate(provider.as_ref(), &prompt).await
    }
}

async fn summarize_memories(provider: &dyn Provider, memories: &[Memory]) -> Result<Summary> {
    if memories.is_empty() {
        return Ok(Summary {
            title: "Empty".to_string(),
            overview: "No memories found".to_string(),
            ..Default::default()
        });
    }
    generate(provider, &summary_prompt(memories)).await
}

fn summary_prompt(memories: &[Memory]) -> String {
    let mut prompt = String::from("Summarize the following memories:\n\n");
    for memory in memories {
        let _ = write!(prompt, "## {}\n{}\n\n", memory.key, memory.text());
    }
    prompt
}
