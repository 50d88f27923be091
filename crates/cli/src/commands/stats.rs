//! Stats command handler.

use clap::Args;
use notewise::setup;
use notewise_core::{AppConfig, AppResult};

/// Show vector store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate_for_ingest()?;
        tracing::info!("Executing stats command");

        let store = setup::store(config, config.embedding.dimensions)?;
        let stats = store.stats().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Table: {} ({})", stats.table, stats.backend);
            println!("  Dimensions: {}", stats.dimensions);
            println!("  Chunks: {}", stats.chunks);
            println!(
                "  Embedding: {} / {}",
                config.embedding.provider, config.embedding.model
            );
        }

        Ok(())
    }
}
