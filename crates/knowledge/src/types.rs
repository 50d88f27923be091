//! Knowledge system type definitions.

use crate::parser::ContentType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source file read during ingestion. Dropped once it has been chunked.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    pub content_type: ContentType,
    /// Size of the file on disk
    pub size_bytes: u64,
}

/// A stored slice of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Text content
    pub text: String,

    /// Metadata (`source_path`, `file_name`, `chunk_index`, `ingested_at`,
    /// `content_hash`)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeChunk {
    /// Path of the document this chunk came from, when recorded.
    pub fn source_path(&self) -> Option<&str> {
        self.metadata.get("source_path").and_then(|v| v.as_str())
    }
}

/// A chunk paired with its embedding, ready to be written to a store.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: KnowledgeChunk,
    pub embedding: Vec<f32>,
}

/// One entry of a retrieval result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,

    /// Cosine similarity in [-1, 1]; `None` when the store reports no score
    pub score: Option<f32>,
}

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory scanned recursively
    pub source_root: PathBuf,

    /// File extensions to include, without the dot (e.g. `md`)
    pub extensions: Vec<String>,

    /// Clear the store before ingesting
    pub reset: bool,

    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,

    /// Chunks per embedding request
    pub batch_size: usize,
}

impl IngestOptions {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            extensions: vec!["md".to_string()],
            reset: false,
            chunk_size: 1024,
            chunk_overlap: 64,
            batch_size: 64,
        }
    }

    /// Whether `path` passes the extension filter.
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Documents read (including ones that produced no chunks)
    pub documents: u32,

    /// Chunks written to the store
    pub chunks: u32,

    /// Bytes read from disk
    pub bytes: u64,

    /// Files skipped because they were binary or unreadable
    pub skipped: u32,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

/// Summary of a vector store table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub backend: String,
    pub table: String,
    pub dimensions: usize,
    pub chunks: usize,
}
