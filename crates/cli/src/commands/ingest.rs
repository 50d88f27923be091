//! Ingest command handler.
//!
//! Offline batch job: reads a directory of notes into the vector store.

use clap::Args;
use notewise::setup;
use notewise_core::{AppConfig, AppResult};
use notewise_knowledge::IngestOptions;
use std::path::PathBuf;

/// Ingest a directory of notes into the vector store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory scanned recursively
    #[arg(long)]
    pub path: PathBuf,

    /// File extensions to include (repeatable)
    #[arg(long = "ext", default_value = "md")]
    pub extensions: Vec<String>,

    /// Clear the table before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate_for_ingest()?;
        tracing::info!("Executing ingest command for {:?}", self.path);

        let embedder = setup::embedder(config)?;
        let store = setup::store(config, embedder.dimensions())?;

        let options = IngestOptions {
            source_root: self.path.clone(),
            extensions: self.extensions.clone(),
            reset: self.reset,
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            batch_size: config.embedding.batch_size.max(1),
        };

        let stats = notewise_knowledge::ingest(&options, embedder.as_ref(), store.as_ref()).await?;

        if self.json {
            let output = serde_json::json!({
                "table": store.table(),
                "documents": stats.documents,
                "chunks": stats.chunks,
                "bytes": stats.bytes,
                "skipped": stats.skipped,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks, {} bytes) into '{}' in {:.2}s",
                stats.documents,
                stats.chunks,
                stats.bytes,
                store.table(),
                stats.duration_secs
            );
            if stats.skipped > 0 {
                println!("Skipped {} unreadable or binary files", stats.skipped);
            }
        }

        Ok(())
    }
}
