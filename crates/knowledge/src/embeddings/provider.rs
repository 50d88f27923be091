//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use notewise_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be safe to share across concurrent requests and
/// must return vectors of exactly [`EmbeddingProvider::dimensions`] values.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Fail unless every vector has the expected length and only finite
/// components.
pub fn ensure_dimensions(vectors: &[Vec<f32>], expected: usize) -> AppResult<()> {
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            bad.len(),
            expected
        )));
    }
    if vectors.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AppError::Embedding(
            "Embedding contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "trigram" => Arc::new(TrigramProvider::new(config.dimensions)),
        "ollama" => Arc::new(OllamaProvider::new(config)?),
        "openai" => Arc::new(OpenAiProvider::new(config)?),
        _ => {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: openai, ollama, trigram",
                config.provider
            )))
        }
    };

    tracing::debug!(
        "Created embedding provider: provider={}, model={}, dimensions={}",
        provider.provider_name(),
        provider.model_name(),
        provider.dimensions()
    );

    Ok(provider)
}
