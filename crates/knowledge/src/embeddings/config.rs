//! Embedding provider configuration.

use notewise_core::config::EmbeddingSettings;
use notewise_core::AppConfig;
use serde::{Deserialize, Serialize};

/// Settings needed to construct an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Resolved API key; never serialized
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Build from application settings, resolving the API key from the
    /// environment variable the settings name.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.trim().to_lowercase(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            api_key: AppConfig::resolve_api_key(settings.api_key_env.as_deref()),
            batch_size: settings.batch_size.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: " Ollama ".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: Some("http://gpu-box:11434".to_string()),
            api_key_env: Some("NOTEWISE_TEST_UNSET_EMBEDDING_KEY".to_string()),
            batch_size: 0,
        };

        let config = EmbeddingConfig::from_settings(&settings);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert!(config.api_key.is_none());
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = EmbeddingConfig {
            api_key: Some("sk-secret".to_string()),
            ..EmbeddingConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
