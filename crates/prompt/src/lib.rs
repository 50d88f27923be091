//! Prompt assembly for NoteWise answers.
//!
//! This crate provides:
//! - Conversation turn types shared by the generation engine and sessions
//! - Handlebars rendering of the grounded chat prompt
//! - History budgeting (oldest exchanges are dropped first)
//! - YAML prompt overrides

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{budget_history, PromptBuilder, DEFAULT_TEMPLATE, SYSTEM_DIRECTIVE};
pub use loader::load_prompt_file;
pub use types::{BuiltPrompt, PromptDefinition, Role, Turn};
