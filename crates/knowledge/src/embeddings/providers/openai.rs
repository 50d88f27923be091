//! OpenAI embeddings provider (`/v1/embeddings`).

use crate::embeddings::provider::ensure_dimensions;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use notewise_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI (or compatible) embedding provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Create a provider. Fails with a configuration error without an API key.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Only the text-embedding-3 family accepts a `dimensions` parameter.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, batch = texts.len(), "Requesting OpenAI embeddings");

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();
        ensure_dimensions(&embeddings, self.dimensions)?;

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 2,
            endpoint: Some(server.uri()),
            api_key: Some("sk-test".to_string()),
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_batch_is_reordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"dimensions": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config_for(&server)).unwrap();
        let embeddings = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_http_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config_for(&server)).unwrap();
        match provider.embed("x").await {
            Err(AppError::Embedding(msg)) => assert!(msg.contains("rate limited")),
            other => panic!("expected embedding error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_dimensions_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config_for(&server)).unwrap();
        assert!(provider.embed("x").await.is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            api_key: Some("sk-secret".to_string()),
            ..EmbeddingConfig::default()
        };
        let provider = OpenAiProvider::new(&config).unwrap();
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
