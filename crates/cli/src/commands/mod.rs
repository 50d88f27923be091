//! Command handlers for the NoteWise CLI.

pub mod clean;
pub mod ingest;
pub mod serve;
pub mod stats;

pub use clean::CleanCommand;
pub use ingest::IngestCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;
