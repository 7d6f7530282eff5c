//! Collaborators - optional services the store leans on
//!
//! Embedder, vector index and text-completion provider are resolved once per
//! scope into [`Collaborators`]. Each slot is a [`Collaborator`]: either
//! available, or unavailable with a reason. Call sites pick one policy:
//! - [`Collaborator::degrade`] for enrichment (index updates after a write)
//! - [`Collaborator::require`] when the collaborator is the whole point
//!   (semantic search, summarize)

pub mod embed;
pub mod index;
pub mod provider;
pub mod reindex;

use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::core::scope::Scope;
use crate::error::{MemError, Result};

pub use embed::{Embedder, HttpEmbedder};
pub use index::{FlatIndex, SearchHit, VectorIndex};
pub use provider::{AutoTag, HttpProvider, Provider, StructuredOutput, Summary};
pub use reindex::{ReindexJob, ReindexQueue};

/// An optional collaborator
#[derive(Debug)]
pub enum Collaborator<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Collaborator<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Collaborator::Available(_))
    }

    /// The collaborator if present; absence is logged and tolerated
    pub fn degrade(&self) -> Option<&T> {
        match self {
            Collaborator::Available(c) => Some(c),
            Collaborator::Unavailable(reason) => {
                debug!(reason = %reason, "collaborator unavailable, degrading");
                None
            }
        }
    }

    pub fn degrade_mut(&mut self) -> Option<&mut T> {
        match self {
            Collaborator::Available(c) => Some(c),
            Collaborator::Unavailable(reason) => {
                debug!(reason = %reason, "collaborator unavailable, degrading");
                None
            }
        }
    }

    /// The collaborator, or `err` when it is missing
    pub fn require(&self, err: MemError) -> Result<&T> {
        match self {
            Collaborator::Available(c) => Ok(c),
            Collaborator::Unavailable(reason) => {
                debug!(reason = %reason, "required collaborator unavailable");
                Err(err)
            }
        }
    }

    pub fn require_mut(&mut self, err: MemError) -> Result<&mut T> {
        match self {
            Collaborator::Available(c) => Ok(c),
            Collaborator::Unavailable(_) => Err(err),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Collaborator::Available(c) => Some(c),
            Collaborator::Unavailable(_) => None,
        }
    }
}

/// Every optional collaborator for one scope
pub struct Collaborators {
    pub embedder: Collaborator<std::sync::Arc<dyn Embedder>>,
    pub index: Collaborator<FlatIndex>,
    pub provider: Collaborator<Box<dyn Provider>>,
}

impl Collaborators {
    /// Resolve collaborators from a scope's config
    ///
    /// Never fails: a misconfigured collaborator becomes unavailable.
    pub fn resolve(scope: &Scope, config: &Config) -> Self {
        let embedder = resolve_embedder(config);
        let index = match &embedder {
            Collaborator::Available(e) => open_index(scope, e.dimension()),
            Collaborator::Unavailable(reason) => Collaborator::Unavailable(reason.clone()),
        };
        let provider = resolve_provider(config);

        Self {
            embedder,
            index,
            provider,
        }
    }

    /// All collaborators unavailable
    pub fn none() -> Self {
        Self {
            embedder: Collaborator::Unavailable("embeddings disabled".into()),
            index: Collaborator::Unavailable("embeddings disabled".into()),
            provider: Collaborator::Unavailable("no provider configured".into()),
        }
    }
}

fn resolve_embedder(config: &Config) -> Collaborator<std::sync::Arc<dyn Embedder>> {
    let emb = &config.embeddings;
    if emb.backend != embed::HTTP_BACKEND {
        return Collaborator::Unavailable(format!("embedding backend {:?}", emb.backend));
    }
    match HttpEmbedder::from_config(emb) {
        Ok(e) => Collaborator::Available(std::sync::Arc::new(e)),
        Err(e) => {
            warn!(error = %e, "embedder misconfigured");
            Collaborator::Unavailable(e.to_string())
        }
    }
}

/// `<base>/<path>`, keeping any path the base URL already has
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|u| u.join(path))
        .map_err(|e| MemError::Config(format!("invalid base url {:?}: {}", base, e)))
}

/// Load the scope's index, starting empty when nothing is saved yet
pub(crate) fn open_index(scope: &Scope, dimension: usize) -> Collaborator<FlatIndex> {
    let mut index = FlatIndex::new(scope.vector_path(), dimension);
    if let Err(e) = index.load() {
        warn!(error = %e, "failed to load index, starting empty");
    }
    Collaborator::Available(index)
}

fn resolve_provider(config: &Config) -> Collaborator<Box<dyn Provider>> {
    let Some(name) = config.default_provider.as_deref() else {
        return Collaborator::Unavailable("no default provider".into());
    };
    let Some(provider) = config.providers.get(name) else {
        return Collaborator::Unavailable(format!("provider {:?} is not registered", name));
    };
    match HttpProvider::from_config(name, provider) {
        Ok(p) => Collaborator::Available(Box::new(p)),
        Err(e) => {
            warn!(provider = name, error = %e, "provider misconfigured");
            Collaborator::Unavailable(e.to_string())
        }
    }
}
