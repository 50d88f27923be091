//! NoteWise service library.
//!
//! Wires configuration into the knowledge, auth and session crates and
//! exposes the HTTP API used by `notewise serve`.

pub mod server;
pub mod setup;
