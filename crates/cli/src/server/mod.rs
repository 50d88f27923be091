//! HTTP API.
//!
//! | Method | Path | Auth | Response |
//! |--------|------|------|----------|
//! | `GET`  | `/health`  | none   | `{status, service}` |
//! | `POST` | `/session` | bearer | `{session_id}` |
//! | `POST` | `/chat`    | bearer | `{session_id, response, sources}` |

mod auth;
mod error;
mod routes;

pub use auth::AuthenticatedUser;
pub use error::ApiError;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use notewise_auth::TokenVerifier;
use notewise_core::{AppConfig, AppError, AppResult, CallContext};
use notewise_session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    /// `Err` carries the reason the answering pipeline failed to start
    sessions: Result<Arc<SessionManager>, Arc<str>>,
    provider_timeout: Duration,
}

impl AppState {
    pub fn new(
        verifier: Arc<TokenVerifier>,
        sessions: Arc<SessionManager>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            sessions: Ok(sessions),
            provider_timeout,
        }
    }

    /// State for a server whose answering pipeline could not be built.
    /// Authenticated endpoints answer 503.
    pub fn unavailable(
        verifier: Arc<TokenVerifier>,
        reason: impl Into<String>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            sessions: Err(Arc::from(reason.into())),
            provider_timeout,
        }
    }

    pub fn sessions(&self) -> AppResult<&Arc<SessionManager>> {
        self.sessions
            .as_ref()
            .map_err(|reason| AppError::Unavailable(reason.to_string()))
    }

    /// Deadline and cancellation for one request's provider calls.
    pub fn call_context(&self) -> CallContext {
        CallContext::new(self.provider_timeout)
    }
}

/// Build handler state from configuration.
///
/// Configuration errors are returned. Any other failure while building the
/// answering pipeline (an unreachable store, say) is logged and the server
/// starts in a degraded state that answers 503.
pub fn build_state(config: &AppConfig) -> AppResult<AppState> {
    let verifier = Arc::new(TokenVerifier::from_config(config)?);
    let timeout = config.provider_timeout();

    match crate::setup::engine(config) {
        Ok(engine) => {
            let sessions = SessionManager::new(Arc::new(engine), config.sessions.on_missing);
            Ok(AppState::new(verifier, Arc::new(sessions), timeout))
        }
        Err(e @ AppError::Config(_)) => Err(e),
        Err(e) => {
            tracing::error!("Answering pipeline failed to start: {}", e);
            Ok(AppState::unavailable(verifier, e.to_string(), timeout))
        }
    }
}

/// The API router with CORS restricted to `cors_origins`.
pub fn router(state: AppState, cors_origins: &[String]) -> AppResult<Router> {
    let origins = cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| AppError::Config(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/health", get(routes::health))
        .route("/session", post(routes::create_session))
        .route("/chat", post(routes::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Serve the API on `config.bind` until Ctrl-C.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    config.validate_for_serve()?;

    let state = build_state(config)?;
    let app = router(state, &config.cors_origins)?;

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("NoteWise API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining in-flight requests");
}
