//! Vector index - exhaustive cosine search persisted as JSON
//!
//! Stored at `<store>/vectors/index.json`. Small stores only: every search
//! scores every vector.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::key::Key;
use crate::error::{MemError, OpContext, Result};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: Key,
    /// Higher is closer; cosine similarity for the vector index, 1.0 for keyword hits
    pub score: f32,
}

/// Approximate or exact nearest-neighbour index over memory embeddings
pub trait VectorIndex {
    fn add(&mut self, key: &Key, vector: Vec<f32>) -> Result<()>;
    fn remove(&mut self, key: &Key) -> Result<()>;
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
    /// Prepare for searching after a batch of adds
    fn build(&mut self) -> Result<()>;
    fn save(&self) -> Result<()>;
    fn load(&mut self) -> Result<()>;
    fn contains(&self, key: &Key) -> bool;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    dimension: usize,
    vectors: BTreeMap<String, Vec<f32>>,
}

/// Flat (brute-force) cosine index
#[derive(Debug)]
pub struct FlatIndex {
    dir: PathBuf,
    dimension: usize,
    vectors: BTreeMap<Key, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dir: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            dir: dir.into(),
            dimension,
            vectors: BTreeMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Drop every vector
    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    fn path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(MemError::Collaborator(format!(
                "vector has dimension {}, index expects {}",
                len, self.dimension
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, key: &Key, vector: Vec<f32>) -> Result<()> {
        self.check_dimension(vector.len())?;
        self.vectors.insert(key.clone(), vector);
        Ok(())
    }

    fn remove(&mut self, key: &Key) -> Result<()> {
        self.vectors.remove(key);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.check_dimension(query.len())?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .map(|(key, v)| SearchHit {
                key: key.clone(),
                score: cosine(query, v),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        if k > 0 {
            hits.truncate(k);
        }
        Ok(hits)
    }

    fn build(&mut self) -> Result<()> {
        let dimension = self.dimension;
        let before = self.vectors.len();
        self.vectors.retain(|_, v| v.len() == dimension);
        let dropped = before - self.vectors.len();
        if dropped > 0 {
            warn!(dropped, "dropped vectors with mismatched dimension");
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).op("create vectors directory")?;
        let file = IndexFile {
            dimension: self.dimension,
            vectors: self
                .vectors
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        let json = serde_json::to_vec(&file)
            .map_err(|e| MemError::Collaborator(format!("serialize index: {}", e)))?;

        // Readers must never see a half-written index
        let tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp, json).op("write index")?;
        fs::rename(&tmp, self.path()).op("replace index")?;

        debug!(vectors = self.vectors.len(), "saved index");
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        let raw = match fs::read(self.path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).op("read index"),
        };
        let file: IndexFile = serde_json::from_slice(&raw)
            .map_err(|e| MemError::Collaborator(format!("parse index: {}", e)))?;

        if file.dimension != self.dimension {
            return Err(MemError::Collaborator(format!(
                "saved index has dimension {}, expected {}; rebuild it",
                file.dimension, self.dimension
            )));
        }

        self.vectors = file
            .vectors
            .into_iter()
            .filter_map(|(k, v)| Key::parse(&k).ok().map(|key| (key, v)))
            .collect();
        Ok(())
    }

    fn contains(&self, key: &Key) -> bool {
        self.vectors.contains_key(key)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
