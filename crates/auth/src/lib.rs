//! Bearer token verification for NoteWise.
//!
//! Tokens are RS256 JWTs signed by an external identity provider. Public
//! keys come from the provider's JWKS endpoint and are cached by key id
//! (see [`JwksCache`]).

pub mod jwks;
pub mod verifier;

pub use jwks::JwksCache;
pub use verifier::{TokenVerifier, VerifiedIdentity};
