//! Ollama Embedding Provider
//!
//! Semantic embeddings via Ollama's local API using models like
//! `nomic-embed-text`. Ollama has no batch endpoint, so batches are embedded
//! one text at a time. Each call is retried with exponential backoff, which
//! is safe because embedding is idempotent.

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use notewise_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider; no network traffic happens until the first embed.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Embed single text with retry logic
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// Embed single text (no retries)
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_with_retries(text).await?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions,
            endpoint: Some(server.uri()),
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed_batch_sends_one_request_per_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "nomic-embed-text"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&config_for(&server, 3)).unwrap();
        let texts = vec!["first".to_string(), "second".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0, 0.0]})),
            )
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&config_for(&server, 2)).unwrap();
        let embedding = provider.embed("retry me").await.unwrap();
        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'nomic-embed-text' not found"})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&config_for(&server, 2)).unwrap();
        match provider.embed("anything").await {
            Err(AppError::Embedding(msg)) => assert!(msg.contains("not found")),
            other => panic!("expected embedding error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0]})),
            )
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&config_for(&server, 768)).unwrap();
        assert!(provider.embed("short vector").await.is_err());
    }
}
