//! Embedder - text to vector
//!
//! One backend: an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::endpoint;
use crate::config::EmbeddingsConfig;
use crate::error::{MemError, Result};

/// Backend name that selects [`HttpEmbedder`]
pub const HTTP_BACKEND: &str = "http";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        if config.model.is_empty() {
            return Err(MemError::Config("embeddings.model is not set".into()));
        }
        if config.dimension == 0 {
            return Err(MemError::Config("embeddings.dimension must be positive".into()));
        }

        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| MemError::Collaborator(format!("create http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint(base, "embeddings")?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut req = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| MemError::Collaborator(format!("embedding request: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MemError::Collaborator(format!(
                "embedding API error ({}): {}",
                status,
                body.trim()
            )));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| MemError::Collaborator(format!("parse embedding response: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MemError::Collaborator("embedding response had no data".into()))?;

        if vector.len() != self.dimension {
            return Err(MemError::Collaborator(format!(
                "embedding has dimension {}, configured {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
