//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a shared client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use notewise_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by OpenAI
///
/// # Errors
/// Returns [`AppError::Config`] when the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => match endpoint {
            Some(url) => Arc::new(OllamaClient::with_base_url(url)),
            None => Arc::new(OllamaClient::new()),
        },
        ProviderType::OpenAI => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config("OpenAI provider requires an API key".to_string())
            })?;
            match endpoint {
                Some(url) => Arc::new(OpenAiClient::with_base_url(url, key)),
                None => Arc::new(OpenAiClient::new(key)),
            }
        }
    };

    tracing::debug!(provider = %provider_type, "Created LLM client");
    Ok(client)
}
