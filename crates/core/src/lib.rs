//! NoteWise Core Library
//!
//! Foundational utilities shared by every NoteWise crate:
//! - Error handling (`AppError`, `AuthError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Per-call deadlines and cancellation (`CallContext`)

pub mod config;
pub mod context;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, MissingSessionPolicy};
pub use context::CallContext;
pub use error::{AppError, AppResult, AuthError};
