//! Builds runtime components from [`AppConfig`].

use notewise_core::{AppConfig, AppResult};
use notewise_knowledge::{
    create_provider, open_store, EmbeddingConfig, EmbeddingProvider, EngineSettings,
    GenerationEngine, Retriever, VectorStore,
};
use notewise_llm::create_client;
use notewise_prompt::{load_prompt_file, PromptBuilder};
use std::sync::Arc;

/// Embedding provider named by `embedding.*`.
pub fn embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from_settings(&config.embedding))
}

/// Vector store at `database_url`, opened for `dimensions`-long vectors.
///
/// Fails with `Config` when the table was built for another dimension.
pub fn store(config: &AppConfig, dimensions: usize) -> AppResult<Arc<dyn VectorStore>> {
    open_store(config.require_database_url()?, &config.table_name, dimensions)
}

/// Prompt builder from `prompt_file`, or the built-in template.
pub fn prompt_builder(config: &AppConfig) -> AppResult<PromptBuilder> {
    let budget = config.retrieval.history_budget_chars;
    match &config.prompt_file {
        Some(path) => PromptBuilder::from_definition(&load_prompt_file(path)?, budget),
        None => PromptBuilder::new(budget),
    }
}

pub fn engine_settings(config: &AppConfig) -> EngineSettings {
    EngineSettings {
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
        top_k: config.retrieval.top_k,
        preview_chars: config.retrieval.preview_chars,
    }
}

/// The full answering pipeline: embedder, store, retriever, LLM and prompt.
pub fn engine(config: &AppConfig) -> AppResult<GenerationEngine> {
    let embedder = embedder(config)?;
    let store = store(config, embedder.dimensions())?;
    let retriever = Retriever::new(embedder, store)?;

    let api_key = AppConfig::resolve_api_key(config.llm.api_key_env.as_deref());
    let llm = create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        api_key.as_deref(),
    )?;

    Ok(GenerationEngine::new(
        retriever,
        llm,
        prompt_builder(config)?,
        engine_settings(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewise_core::AppError;

    fn offline_config(database_url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.database_url = Some(database_url.to_string());
        config.embedding.provider = "trigram".to_string();
        config.embedding.dimensions = 64;
        config.llm.provider = "ollama".to_string();
        config
    }

    #[test]
    fn test_engine_from_offline_config() {
        let config = offline_config("memory");
        let engine = engine(&config).unwrap();
        assert_eq!(engine.settings().top_k, 4);
        assert_eq!(engine.settings().preview_chars, 200);
    }

    #[test]
    fn test_missing_database_is_config_error() {
        let mut config = offline_config("memory");
        config.database_url = None;
        assert!(matches!(engine(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_dimension_change_fails_fast() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = dir.path().join("notes.db").display().to_string();
        let mut config = offline_config(&url);

        engine(&config).unwrap();
        config.embedding.dimensions = 128;
        assert!(matches!(engine(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_custom_prompt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prompt.yaml");
        std::fs::write(
            &path,
            "id: strict\nsystem: Only quote the notes.\ntemplate: \"Q: {{question}}\"\n",
        )
        .unwrap();

        let mut config = offline_config("memory");
        config.prompt_file = Some(path);
        assert_eq!(prompt_builder(&config).unwrap().system(), "Only quote the notes.");
    }
}
