//! Embedding providers.
//!
//! Everything that turns text into vectors goes through
//! [`EmbeddingProvider`], so ingestion and retrieval can run against a
//! deterministic offline provider in tests.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, ensure_dimensions, EmbeddingProvider};
