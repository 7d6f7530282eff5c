//! Search use cases: keyword scan, semantic lookup, index rebuild

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{check, MemoryService};
use crate::collab::{Embedder, FlatIndex, ReindexJob, SearchHit, VectorIndex};
use crate::core::scope::Scope;
use crate::core::store::VersionedStore;
use crate::error::{MemError, Result};

/// Rebuilds a scope's vector index from every memory in it
pub struct IndexRebuild {
    scope: Scope,
    embedder: Arc<dyn Embedder>,
}

impl IndexRebuild {
    pub fn new(scope: Scope, embedder: Arc<dyn Embedder>) -> Self {
        Self { scope, embedder }
    }
}

#[async_trait]
impl ReindexJob for IndexRebuild {
    async fn run(&self) -> Result<usize> {
        let memories = VersionedStore::open(&self.scope)?.list("")?;

        let mut index = FlatIndex::new(self.scope.vector_path(), self.embedder.dimension());
        for memory in &memories {
            let vector = self.embedder.embed(&memory.text()).await?;
            index.add(&memory.key, vector)?;
        }
        index.build()?;
        index.save()?;

        debug!(scope = %self.scope, count = memories.len(), "index rebuilt");
        Ok(memories.len())
    }
}

impl MemoryService {
    /// Case-insensitive substring match over keys and content
    ///
    /// Every hit scores 1.0; `limit == 0` is unbounded.
    pub fn keyword_search(
        &self,
        hint: &str,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        let (_, store) = self.open(hint, cancel)?;
        let needle = query.to_lowercase();

        let hits = store
            .list("")?
            .into_iter()
            .filter(|m| {
                m.key.as_str().to_lowercase().contains(&needle)
                    || m.text().to_lowercase().contains(&needle)
            })
            .map(|m| SearchHit {
                key: m.key,
                score: 1.0,
            });

        Ok(if limit > 0 {
            hits.take(limit).collect()
        } else {
            hits.collect()
        })
    }

    /// Nearest memories to `query` by embedding similarity
    pub async fn semantic_search(
        &self,
        hint: &str,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        let (scope, store) = self.open(hint, cancel)?;
        drop(store);

        let collabs = self.collaborators(&scope);
        let embedder = collabs.embedder.require(MemError::NoEmbedder)?;
        let index = collabs.index.require(MemError::NoIndex)?;
        check(cancel)?;
        search_index(embedder.as_ref(), index, query, limit).await
    }

    /// Re-embed every memory and replace the scope's index
    pub async fn rebuild_index(&self, hint: &str, cancel: &CancellationToken) -> Result<usize> {
        let (scope, store) = self.open(hint, cancel)?;
        drop(store);

        let collabs = self.collaborators(&scope);
        let embedder = collabs.embedder.require(MemError::NoEmbedder)?;
        let count = IndexRebuild::new(scope.clone(), Arc::clone(embedder))
            .run()
            .await?;

        info!(scope = %scope, count, "rebuilt index");
        Ok(count)
    }

    /// Queue a background rebuild when the scope has an embedder
    pub(crate) fn request_reindex(&self, scope: &Scope) -> bool {
        let collabs = self.collaborators(scope);
        match collabs.embedder.into_option() {
            Some(embedder) => self
                .reindex
                .request(Arc::new(IndexRebuild::new(scope.clone(), embedder))),
            None => false,
        }
    }

    /// Rebuild requested by the post-commit hook
    ///
    /// With a detached binary configured the rebuild runs in its own process
    /// and nothing here waits for it.
    pub(crate) fn request_hook_reindex(&self, scope: &Scope) -> bool {
        let Some(exe) = &self.reindex_exe else {
            return self.request_reindex(scope);
        };
        if self.collaborators(scope).embedder.into_option().is_none() {
            return false;
        }

        match reindex_command(exe, scope).spawn() {
            Ok(child) => {
                debug!(pid = child.id(), scope = %scope, "detached reindex started");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to start detached reindex");
                false
            }
        }
    }
}

/// `<exe> index --scope <kind>`, run from the scope root with no stdio
pub(crate) fn reindex_command(exe: &Path, scope: &Scope) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg("index")
        .arg("--scope")
        .arg(scope.kind.to_string())
        .current_dir(&scope.root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

async fn search_index(
    embedder: &dyn Embedder,
    index: &FlatIndex,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    if index.is_empty() {
        return Err(MemError::NoIndex);
    }
    let vector = embedder.embed(query).await?;
    index.search(&vector, limit)
}
