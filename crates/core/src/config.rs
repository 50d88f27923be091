//! Configuration management for NoteWise.
//!
//! Configuration is layered, later layers winning:
//! 1. Built-in defaults
//! 2. YAML config file (`NOTEWISE_CONFIG`, `--config`, or `./notewise.yaml`)
//! 3. Environment variables
//! 4. Command-line flags
//!
//! The database connection string and the key-set endpoint have no default.
//! A missing database is reported by `validate_for_serve` / `validate_for_ingest`;
//! a missing key-set endpoint is reported by the token verifier on each call.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG_FILE: &str = "notewise.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Config file that was merged, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Vector store location: a SQLite path, `sqlite://<path>`, or `memory`
    pub database_url: Option<String>,

    /// Identity provider key-set (JWKS) endpoint
    pub jwks_url: Option<String>,

    /// HTTP listen address
    pub bind: String,

    /// Chunk table shared by ingestion and retrieval
    pub table_name: String,

    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,

    /// Optional YAML prompt definition overriding the built-in template
    pub prompt_file: Option<PathBuf>,

    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
    pub auth: AuthSettings,
    pub sessions: SessionSettings,
    pub timeouts: TimeoutSettings,

    /// Log level override
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,

    /// Disable colored output
    #[serde(skip)]
    pub no_color: bool,
}

/// Embedding provider settings. Must match between ingestion and serving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// "openai", "ollama" or "trigram"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            batch_size: 64,
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// "openai" or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            temperature: Some(0.2),
            max_tokens: Some(1024),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Maximum characters of chunk text echoed back per source
    pub preview_chars: usize,
    /// Character budget for prior conversation turns in the prompt
    pub history_budget_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            preview_chars: 200,
            history_budget_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
    /// Accepted signing algorithms (JWA names)
    pub algorithms: Vec<String>,
    /// How long a fetched key set is trusted
    pub cache_ttl_secs: u64,
    /// Minimum gap between key-set refreshes triggered by misses
    pub min_refresh_interval_secs: u64,
    /// Clock skew tolerance for `exp`
    pub leeway_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            algorithms: vec!["RS256".to_string()],
            cache_ttl_secs: 300,
            min_refresh_interval_secs: 30,
            leeway_secs: 30,
        }
    }
}

/// What to do when a chat names a session the server does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingSessionPolicy {
    /// Create a fresh session under the requested id and log a warning.
    #[default]
    Recreate,
    /// Fail with `SessionNotFound`.
    Reject,
}

impl MissingSessionPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "recreate" => Some(Self::Recreate),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SessionSettings {
    pub on_missing: MissingSessionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Deadline for each external call (key set, embedding, search, generation)
    pub provider_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self { provider_secs: 30 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            database_url: None,
            jwks_url: None,
            bind: "0.0.0.0:8000".to_string(),
            table_name: "data_embeddings".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            prompt_file: None,
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            chunking: ChunkingSettings::default(),
            auth: AuthSettings::default(),
            sessions: SessionSettings::default(),
            timeouts: TimeoutSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and process environment.
    ///
    /// Environment variables:
    /// - `NOTEWISE_CONFIG`: Path to a YAML config file
    /// - `NOTEWISE_DATABASE_URL`: Vector store location
    /// - `NOTEWISE_JWKS_URL`: Key-set endpoint
    /// - `NOTEWISE_BIND`: Listen address
    /// - `NOTEWISE_TABLE`: Chunk table name
    /// - `NOTEWISE_EMBEDDING_PROVIDER`, `NOTEWISE_EMBEDDING_MODEL`,
    ///   `NOTEWISE_EMBEDDING_DIMENSIONS`
    /// - `NOTEWISE_LLM_PROVIDER`, `NOTEWISE_LLM_MODEL`
    /// - `NOTEWISE_SESSION_POLICY`: `recreate` or `reject`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use notewise_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Table: {}", config.table_name);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `env` as the environment lookup.
    pub fn load_with<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = env("NOTEWISE_CONFIG").map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::from_yaml_file(&path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_yaml_file(&fallback)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(env)?;
        Ok(config)
    }

    /// Read a YAML config file. Unspecified keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.config_file = Some(path.to_path_buf());

        tracing::debug!("Loaded config file {:?}", path);
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env("NOTEWISE_DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(url) = env("NOTEWISE_JWKS_URL") {
            self.jwks_url = Some(url);
        }
        if let Some(bind) = env("NOTEWISE_BIND") {
            self.bind = bind;
        }
        if let Some(table) = env("NOTEWISE_TABLE") {
            self.table_name = table;
        }
        if let Some(provider) = env("NOTEWISE_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = env("NOTEWISE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = env("NOTEWISE_EMBEDDING_DIMENSIONS") {
            self.embedding.dimensions = dims.parse().map_err(|_| {
                AppError::Config(format!(
                    "NOTEWISE_EMBEDDING_DIMENSIONS must be a positive integer, got '{}'",
                    dims
                ))
            })?;
        }
        if let Some(provider) = env("NOTEWISE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = env("NOTEWISE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(policy) = env("NOTEWISE_SESSION_POLICY") {
            self.sessions.on_missing = MissingSessionPolicy::parse(&policy).ok_or_else(|| {
                AppError::Config(format!(
                    "NOTEWISE_SESSION_POLICY must be 'recreate' or 'reject', got '{}'",
                    policy
                ))
            })?;
        }

        self.log_level = env("RUST_LOG");
        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        database_url: Option<String>,
        jwks_url: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(url) = database_url {
            self.database_url = Some(url);
        }

        if let Some(url) = jwks_url {
            self.jwks_url = Some(url);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// The configured database location, or a configuration error.
    pub fn require_database_url(&self) -> AppResult<&str> {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(AppError::Config(
                "database connection string is required (set NOTEWISE_DATABASE_URL)".to_string(),
            )),
        }
    }

    /// Per-stage deadline for provider calls.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.provider_secs.max(1))
    }

    /// Resolve an API key from the environment variable named in settings.
    pub fn resolve_api_key(api_key_env: Option<&str>) -> Option<String> {
        api_key_env.and_then(|name| std::env::var(name).ok())
    }

    /// Checks shared by every command that touches the vector store.
    pub fn validate_for_ingest(&self) -> AppResult<()> {
        self.require_database_url()?;
        validate_identifier(&self.table_name)?;

        let known_embedders = ["openai", "ollama", "trigram"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 || self.chunking.chunk_overlap >= self.chunking.chunk_size
        {
            return Err(AppError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        Ok(())
    }

    /// Checks required before the HTTP service starts.
    pub fn validate_for_serve(&self) -> AppResult<()> {
        self.validate_for_ingest()?;

        let known_llms = ["openai", "ollama"];
        if !known_llms.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                known_llms.join(", ")
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }

        if self.jwks_url.is_none() {
            tracing::warn!("NOTEWISE_JWKS_URL is not set; every authenticated request will fail");
        }

        Ok(())
    }
}

/// SQL identifiers are interpolated into statements, so keep them boring.
pub fn validate_identifier(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && name.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Invalid table name '{}': use letters, digits and underscores",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.table_name, "data_embeddings");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.retrieval.preview_chars, 200);
        assert_eq!(config.sessions.on_missing, MissingSessionPolicy::Recreate);
        assert!(config.database_url.is_none());
        assert!(config.jwks_url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::load_with(env_from(&[
            ("NOTEWISE_DATABASE_URL", "/tmp/notes.sqlite"),
            ("NOTEWISE_JWKS_URL", "https://id.example.com/.well-known/jwks.json"),
            ("NOTEWISE_EMBEDDING_PROVIDER", "trigram"),
            ("NOTEWISE_EMBEDDING_DIMENSIONS", "384"),
            ("NOTEWISE_SESSION_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("/tmp/notes.sqlite"));
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.sessions.on_missing, MissingSessionPolicy::Reject);
    }

    #[test]
    fn test_bad_dimension_env_is_config_error() {
        let result = AppConfig::load_with(env_from(&[("NOTEWISE_EMBEDDING_DIMENSIONS", "lots")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_file_merges_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_url: memory\nretrieval:\n  top_k: 8\nembedding:\n  provider: ollama\n  model: nomic-embed-text\n  dimensions: 768\n"
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_from(&[("NOTEWISE_CONFIG", &path)])).unwrap();

        assert_eq!(config.database_url.as_deref(), Some("memory"));
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.preview_chars, 200);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.config_file.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let result = AppConfig::load_with(env_from(&[("NOTEWISE_CONFIG", "/nonexistent/nw.yaml")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("memory".to_string()),
            None,
            None,
            true,
            false,
        );

        assert_eq!(config.database_url.as_deref(), Some("memory"));
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_requires_database() {
        let config = AppConfig::default();
        match config.validate_for_serve() {
            Err(AppError::Config(msg)) => assert!(msg.contains("database")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = AppConfig::default();
        config.database_url = Some("memory".to_string());
        config.llm.provider = "carrier-pigeon".to_string();
        assert!(config.validate_for_serve().is_err());
        assert!(config.validate_for_ingest().is_ok());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("data_embeddings").is_ok());
        assert!(validate_identifier("chunks2").is_ok());
        assert!(validate_identifier("2chunks").is_err());
        assert!(validate_identifier("chunks; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }
}
