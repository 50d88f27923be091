//! Error types for the NoteWise service.
//!
//! One unified enum covers every failure category. Provider-level variants
//! (`Llm`, `Embedding`, `Store`) are raw failures; components translate them
//! into the caller-facing `Retrieval` and `Generation` kinds at their
//! boundaries so a caller can always tell "nothing found" from "could not
//! check".

use thiserror::Error;

/// Token verification failures.
///
/// Every variant is reported to the client as access denied, except
/// `MissingConfiguration`, which is a server-side configuration problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The key-set endpoint is not configured.
    #[error("key-set endpoint is not configured")]
    MissingConfiguration,

    /// Header unparsable, key id absent, or claims unreadable.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// No key with the token's key id in the published key set.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    /// The key set could not be fetched.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl AuthError {
    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingConfiguration => "missing_configuration",
            Self::MalformedToken(_) => "malformed_token",
            Self::UnknownKey(_) => "unknown_key",
            Self::ExpiredToken => "expired_token",
            Self::InvalidSignature => "invalid_signature",
            Self::ProviderUnavailable(_) => "provider_unavailable",
        }
    }
}

/// Unified error type for NoteWise.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or inconsistent configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bearer token verification failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Authenticated caller is not allowed to touch the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request payload rejected before any work was done
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Embedding provider or vector store failed while answering a query
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// LLM provider failed while generating an answer
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A provider call exceeded its deadline
    #[error("Timed out during {0}")]
    Timeout(String),

    /// The caller cancelled the operation
    #[error("Cancelled during {0}")]
    Cancelled(String),

    /// A subsystem is not available (e.g. failed to initialise)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Raw LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Raw embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Raw vector store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Re-label a raw provider failure as a retrieval failure.
    ///
    /// Deadline and cancellation errors keep their own kind.
    pub fn into_retrieval(self) -> Self {
        match self {
            e @ (Self::Timeout(_) | Self::Cancelled(_) | Self::Retrieval(_)) => e,
            other => Self::Retrieval(other.to_string()),
        }
    }

    /// Re-label a raw provider failure as a generation failure.
    pub fn into_generation(self) -> Self {
        match self {
            e @ (Self::Timeout(_) | Self::Cancelled(_) | Self::Generation(_)) => e,
            other => Self::Generation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
