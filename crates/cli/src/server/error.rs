//! JSON error responses.
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "access denied" } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use notewise_core::{AppError, AuthError};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// An [`AppError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_and_code(&self.0).0
    }
}

fn status_and_code(err: &AppError) -> (StatusCode, &'static str) {
    match err {
        AppError::Auth(AuthError::MissingConfiguration) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "auth_not_configured")
        }
        AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
        AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
        AppError::Retrieval(_) => (StatusCode::SERVICE_UNAVAILABLE, "retrieval_failed"),
        AppError::Generation(_) => (StatusCode::SERVICE_UNAVAILABLE, "generation_failed"),
        AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        AppError::Cancelled(_) => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

/// Client-facing message. Server-side failures get a fixed message; the
/// detail only goes to the log.
fn public_message(err: &AppError, status: StatusCode) -> String {
    match err {
        AppError::Auth(AuthError::MissingConfiguration) => {
            "authentication is not configured".to_string()
        }
        AppError::Auth(_) => "access denied".to_string(),
        AppError::Retrieval(_) => "could not search the notes".to_string(),
        AppError::Generation(_) => "could not generate an answer".to_string(),
        AppError::Unavailable(_) => "the answering service is unavailable".to_string(),
        AppError::Timeout(stage) => format!("timed out during {}", stage),
        _ if status.is_server_error() => "internal error".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = status_and_code(&self.0);

        if status.is_server_error() {
            tracing::error!(code, "Request failed: {}", self.0);
        } else {
            tracing::debug!(code, "Request rejected: {}", self.0);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: public_message(&self.0, status),
            },
        };
        (status, Json(body)).into_response()
    }
}
