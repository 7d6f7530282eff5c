//! Text-completion provider
//!
//! One backend: an OpenAI-compatible `/chat/completions` endpoint. Structured
//! results are requested as JSON objects and deserialized into typed outputs
//! via [`generate`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::endpoint;
use crate::config::ProviderConfig;
use crate::error::{MemError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// A JSON value shaped by `schema`
    async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value>;
}

/// A typed result a provider can be asked for
pub trait StructuredOutput: DeserializeOwned {
    fn schema() -> Value;
}

/// Ask `provider` for a `T`
pub async fn generate<T: StructuredOutput>(provider: &dyn Provider, prompt: &str) -> Result<T> {
    let value = provider.generate_object(prompt, &T::schema()).await?;
    serde_json::from_value(value)
        .map_err(|e| MemError::Collaborator(format!("provider returned malformed object: {}", e)))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StructuredOutput for Summary {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "overview": {"type": "string"},
                "key_points": {"type": "array", "items": {"type": "string"}},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["title", "overview", "key_points", "tags"]
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoTag {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub confidence: f32,
}

impl StructuredOutput for AutoTag {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "category": {"type": "string"},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            },
            "required": ["tags", "category", "confidence"]
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    name: String,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpProvider {
    /// Build from a registered provider entry
    ///
    /// `openai` and `ollama` have default base URLs; any other name needs one.
    pub fn from_config(name: &str, config: &ProviderConfig) -> Result<Self> {
        if config.model.is_empty() {
            return Err(MemError::Config(format!("provider {:?} has no model", name)));
        }

        let base = match (config.base_url.as_deref(), name) {
            (Some(url), _) => url,
            (None, "openai") => OPENAI_BASE_URL,
            (None, "ollama") => OLLAMA_BASE_URL,
            (None, _) => {
                return Err(MemError::Config(format!(
                    "provider {:?} needs a base_url",
                    name
                )))
            }
        };

        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| MemError::Collaborator(format!("create http client: {}", e)))?;

        Ok(Self {
            client,
            name: name.to_string(),
            endpoint: endpoint(base, "chat/completions")?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn chat(&self, messages: Vec<ChatMessage<'_>>, json_mode: bool) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            response_format: json_mode.then(|| json!({"type": "json_object"})),
        };

        let mut req = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| MemError::Collaborator(format!("{}: request failed: {}", self.name, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(MemError::Collaborator(format!(
                "{}: API error ({}): {}",
                self.name,
                status,
                text.trim()
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| MemError::Collaborator(format!("{}: parse response: {}", self.name, e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MemError::Collaborator(format!("{}: empty completion", self.name)))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(
            vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            false,
        )
        .await
    }

    async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let system = format!(
            "Respond with a single JSON object matching this JSON Schema and nothing else:\n{}",
            schema
        );
        let raw = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: &system,
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt,
                    },
                ],
                true,
            )
            .await?;
        parse_json_object(&raw)
    }
}

/// Parse a model reply as JSON, tolerating a surrounding code fence
fn parse_json_object(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| MemError::Collaborator(format!("provider reply is not JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Value);

    #[async_trait]
    impl Provider for Fixed {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn generate_object(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_from_config_defaults() {
        let cfg = ProviderConfig {
            api_key: Some("sk".into()),
            base_url: None,
            model: "gpt-4o-mini".into(),
        };
        let p = HttpProvider::from_config("openai", &cfg).unwrap();
        assert_eq!(p.endpoint().as_str(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(p.name(), "openai");

        assert!(HttpProvider::from_config("custom", &cfg).is_err());
    }

    #[test]
    fn test_from_config_requires_model() {
        let cfg = ProviderConfig::default();
        assert!(matches!(
            HttpProvider::from_config("openai", &cfg),
            Err(MemError::Config(_))
        ));
    }

    #[test]
    fn test_parse_json_object() {
        assert_eq!(parse_json_object("{\"a\":1}").unwrap(), json!({"a": 1}));
        assert_eq!(
            parse_json_object("```json\n{\"a\":1}\n```").unwrap(),
            json!({"a": 1})
        );
        assert!(parse_json_object("sorry, no").is_err());
    }

    #[tokio::test]
    async fn test_generate_typed() {
        let provider = Fixed(json!({
            "tags": ["rust", "git"],
            "category": "engineering",
            "confidence": 0.75
        }));
        let tags: AutoTag = generate(&provider, "tag this").await.unwrap();
        assert_eq!(tags.tags, vec!["rust", "git"]);
        assert_eq!(tags.category, "engineering");
        assert!((tags.confidence - 0.75).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_generate_malformed() {
        let provider = Fixed(json!({"tags": "not a list"}));
        let res: Result<AutoTag> = generate(&provider, "tag this").await;
        assert!(matches!(res, Err(MemError::Collaborator(_))));
    }

    #[test]
    fn test_summary_schema_lists_fields() {
        let schema = Summary::schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
    }
}
