//! Bearer-token authentication extractor.

use super::error::ApiError;
use super::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use notewise_core::AuthError;

/// The verified caller of a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.verifier.verify(token, &state.call_context()).await?;

        Ok(Self {
            user_id: identity.user_id,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| malformed("missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| malformed("Authorization header is not valid ASCII"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| malformed("Authorization header must be 'Bearer <token>'"))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(malformed("Authorization header must be 'Bearer <token>'"));
    }

    Ok(token)
}

fn malformed(message: &str) -> ApiError {
    tracing::warn!(kind = "malformed_token", "{}", message);
    ApiError(AuthError::MalformedToken(message.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/chat");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&parts_with(Some("bearer  tok "))).unwrap(), "tok");
    }

    #[test]
    fn test_rejected_headers() {
        for header in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer "), Some("Bearer")] {
            let err = bearer_token(&parts_with(header)).unwrap_err();
            assert_eq!(err.status().as_u16(), 401, "{header:?}");
        }
    }
}
