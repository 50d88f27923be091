//! Offline ingestion: walk a directory, chunk every matching document,
//! embed the chunks and append them to the vector store.

use crate::chunker;
use crate::embeddings::{ensure_dimensions, EmbeddingProvider};
use crate::parser;
use crate::store::VectorStore;
use crate::types::{Document, EmbeddedChunk, IngestOptions, IngestStats, KnowledgeChunk};
use chrono::Utc;
use notewise_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

/// Ingest every file under `options.source_root` that passes the extension
/// filter.
///
/// Fails with [`AppError::Config`] when the root does not exist. Binary and
/// unreadable files are skipped; any embedding or store failure aborts the
/// run. Prior contents of the store are kept unless `options.reset` is set.
pub async fn ingest(
    options: &IngestOptions,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let root = &options.source_root;

    if !root.exists() {
        return Err(AppError::Config(format!(
            "Source directory does not exist: {}",
            root.display()
        )));
    }
    if embedder.dimensions() != store.dimensions() {
        return Err(AppError::Config(format!(
            "Embedding provider '{}' produces {} dimensions but table '{}' stores {}",
            embedder.model_name(),
            embedder.dimensions(),
            store.table(),
            store.dimensions()
        )));
    }

    tracing::info!(
        root = %root.display(),
        extensions = ?options.extensions,
        provider = embedder.provider_name(),
        table = store.table(),
        "Starting ingestion"
    );

    if options.reset {
        tracing::info!(table = store.table(), "Clearing store before ingestion");
        store.clear().await?;
    }

    let mut stats = IngestStats::default();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path {:?}: {}", e.path(), e);
                stats.skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !options.accepts(path) {
            continue;
        }

        let document = match parser::parse_file(path) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.skipped += 1;
                continue;
            }
        };

        let written = ingest_document(&document, options, embedder, store).await?;
        stats.documents += 1;
        stats.chunks += written;
        stats.bytes += document.size_bytes;
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingestion completed: {} documents, {} chunks, {} bytes, {} skipped in {:.2}s",
        stats.documents,
        stats.chunks,
        stats.bytes,
        stats.skipped,
        stats.duration_secs
    );

    Ok(stats)
}

/// Chunk, embed and store one document. Returns the number of chunks written.
async fn ingest_document(
    document: &Document,
    options: &IngestOptions,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> AppResult<u32> {
    let pieces = chunker::chunk_text(&document.text, options.chunk_size, options.chunk_overlap)?;
    if pieces.is_empty() {
        tracing::debug!("No content in {:?}", document.path);
        return Ok(0);
    }

    let ingested_at = Utc::now().to_rfc3339();
    let chunks: Vec<KnowledgeChunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| build_chunk(&document.path, index, text, &ingested_at))
        .collect();

    let mut written = 0u32;
    for batch in chunks.chunks(options.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} chunks",
                embeddings.len(),
                batch.len()
            )));
        }
        ensure_dimensions(&embeddings, embedder.dimensions())?;

        let embedded = batch
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();
        written += store.add(embedded).await? as u32;
    }

    tracing::debug!(
        "Processed {:?}: {} chunks, {} bytes",
        document.path,
        written,
        document.size_bytes
    );

    Ok(written)
}

fn build_chunk(path: &Path, index: usize, text: String, ingested_at: &str) -> KnowledgeChunk {
    let content_hash = format!("{:x}", Sha256::digest(text.as_bytes()));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    KnowledgeChunk {
        id: uuid::Uuid::new_v4().to_string(),
        metadata: serde_json::json!({
            "source_path": path.to_string_lossy(),
            "file_name": file_name,
            "chunk_index": index,
            "ingested_at": ingested_at,
            "content_hash": content_hash,
        }),
        text,
    }
}
