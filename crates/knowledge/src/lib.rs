//! Knowledge layer for NoteWise.
//!
//! Turns a directory of notes into embedded chunks in a vector store, and
//! answers questions over them:
//! - [`ingest()`] walks, parses, chunks, embeds and stores documents
//! - [`Retriever`] embeds a query and ranks stored chunks
//! - [`GenerationEngine`] grounds an LLM answer in the retrieved chunks

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod parser;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use ingest::ingest;
pub use rag::{Answer, Conversation, EngineSettings, GenerationEngine, SourceRef};
pub use retriever::Retriever;
pub use store::{drop_store, open_store, MemoryVectorStore, SqliteVectorStore, VectorStore};
pub use types::{
    Document, EmbeddedChunk, IngestOptions, IngestStats, KnowledgeChunk, ScoredChunk, StoreStats,
};
