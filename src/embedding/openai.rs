//! OpenAI-compatible `/v1/embeddings` provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::EmbeddingError;
use super::provider::{EmbeddingProvider, ensure_count};
use super::vector::EmbeddingVector;
use crate::sanitize::{redact_secrets, truncate_for_log};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_TIMEOUT: Duration = Duration::from_secs(30);

/// Max chars of a provider error body kept in [`EmbeddingError::Provider`].
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Requested output dimension (only honored by models that support shortening).
    pub dimensions: Option<usize>,
    pub timeout: Duration,
}

impl OpenAiConfig {
    const ENV_API_KEY: &'static str = "TYPEAHEAD_OPENAI_API_KEY";
    const ENV_BASE_URL: &'static str = "TYPEAHEAD_OPENAI_BASE_URL";
    const ENV_MODEL: &'static str = "TYPEAHEAD_OPENAI_MODEL";
    const ENV_DIMENSIONS: &'static str = "TYPEAHEAD_OPENAI_DIMENSIONS";
    const ENV_TIMEOUT_SECS: &'static str = "TYPEAHEAD_OPENAI_TIMEOUT_SECS";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: None,
            timeout: DEFAULT_OPENAI_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `TYPEAHEAD_OPENAI_*`. Returns `None` when no API key is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(Self::ENV_API_KEY)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = std::env::var(Self::ENV_BASE_URL)
            && !base_url.trim().is_empty()
        {
            config = config.with_base_url(base_url.trim());
        }
        if let Ok(model) = std::env::var(Self::ENV_MODEL)
            && !model.trim().is_empty()
        {
            config.model = model.trim().to_string();
        }
        config.dimensions = std::env::var(Self::ENV_DIMENSIONS)
            .ok()
            .and_then(|v| v.parse().ok());
        if let Some(secs) = std::env::var(Self::ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }

        Some(config)
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.api_key.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "api key cannot be empty".to_string(),
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!("base url must be http(s), got '{}'", self.base_url),
            });
        }
        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model cannot be empty".to_string(),
            });
        }
        if self.dimensions == Some(0) {
            return Err(EmbeddingError::InvalidConfig {
                reason: "dimensions must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_body(&self, texts: &[String]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });
        if let Some(dims) = self.config.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }
        body
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn generate(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            model = %self.config.model,
            inputs = texts.len(),
            "Requesting embeddings"
        );

        let response = self
            .client
            .post(self.config.embeddings_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(texts))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&body);
            warn!(
                status = status.as_u16(),
                message = %message,
                "Embedding request rejected"
            );
            return Err(EmbeddingError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::malformed(e.to_string()))?;

        parse_response(json, texts.len())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Turns a `/v1/embeddings` body into vectors ordered by input position.
pub(crate) fn parse_response(
    json: serde_json::Value,
    expected: usize,
) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
    let mut response: EmbeddingsResponse =
        serde_json::from_value(json).map_err(|e| EmbeddingError::malformed(e.to_string()))?;

    ensure_count(expected, response.data.len())?;
    response.data.sort_by_key(|d| d.index);

    let mut vectors = Vec::with_capacity(expected);
    for (position, data) in response.data.into_iter().enumerate() {
        if data.index != position {
            return Err(EmbeddingError::malformed(format!(
                "missing embedding for input {}",
                position
            )));
        }
        if data.embedding.is_empty() {
            return Err(EmbeddingError::malformed(format!(
                "empty embedding for input {}",
                position
            )));
        }
        vectors.push(EmbeddingVector::new(data.embedding));
    }

    Ok(vectors)
}

/// Extracts `error.message` from an API error body, falling back to the raw text.
/// The result is redacted and truncated.
pub(crate) fn error_message_from_body(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.is_empty() {
        return "provider returned an error without a message".to_string();
    }

    truncate_for_log(&redact_secrets(&message), ERROR_BODY_LIMIT)
}
