//! Serve command handler.

use clap::Args;
use notewise_core::{AppConfig, AppResult};

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Listen address (overrides `bind` / NOTEWISE_BIND)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }

        tracing::info!(
            table = %config.table_name,
            embedding = %config.embedding.provider,
            llm = %config.llm.provider,
            "Starting NoteWise API"
        );

        notewise::server::serve(&config).await
    }
}
