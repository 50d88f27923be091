//! Retrieval-augmented answering with source attribution.

pub mod engine;
pub mod types;

pub use engine::{EngineSettings, GenerationEngine};
pub use types::{preview, Answer, Conversation, SourceRef, TRUNCATION_MARKER, UNKNOWN_SOURCE};
