//! In-memory conversational sessions.
//!
//! Sessions live only as long as the process. Each is owned by exactly one
//! user and carries its own conversation history.

pub mod manager;
pub mod types;

pub use manager::SessionManager;
pub use types::{SessionHandle, SessionLookup};
