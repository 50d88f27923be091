//! NoteWise CLI
//!
//! Entry point for the `notewise` binary: the HTTP API (`serve`) and the
//! offline store tools (`ingest`, `stats`, `clean`).

mod commands;

use clap::{Parser, Subcommand};
use commands::{CleanCommand, IngestCommand, ServeCommand, StatsCommand};
use notewise_core::logging::{self, LogFormat};
use notewise_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// NoteWise - ask questions over your own notes
#[derive(Parser, Debug)]
#[command(name = "notewise")]
#[command(about = "Retrieval-augmented Q&A over a private note collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "NOTEWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Vector store location (SQLite path, sqlite://path, or memory)
    #[arg(long, global = true, env = "NOTEWISE_DATABASE_URL")]
    database_url: Option<String>,

    /// Identity provider key-set (JWKS) endpoint
    #[arg(long, global = true, env = "NOTEWISE_JWKS_URL")]
    jwks_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Ingest a directory of notes into the vector store
    Ingest(IngestCommand),

    /// Show vector store statistics
    Stats(StatsCommand),

    /// Drop the chunk table
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // An explicit --config wins over the environment and ./notewise.yaml
    let config_path = cli.config.clone();
    let config = AppConfig::load_with(|key| match (key, &config_path) {
        ("NOTEWISE_CONFIG", Some(path)) => Some(path.display().to_string()),
        _ => std::env::var(key).ok(),
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.database_url,
        cli.jwks_url,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = LogFormat::parse(&cli.log_format).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown log format '{}': use text or json",
            cli.log_format
        ))
    })?;
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("NoteWise starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Table: {}", config.table_name);

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
