//! Clean command handler.

use clap::Args;
use notewise_core::{AppConfig, AppResult};

/// Drop the chunk table so the next ingest starts from scratch
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let url = config.require_database_url()?;
        tracing::info!("Executing clean command for table '{}'", config.table_name);

        notewise_knowledge::drop_store(url, &config.table_name)?;

        println!("Table '{}' dropped", config.table_name);
        Ok(())
    }
}
