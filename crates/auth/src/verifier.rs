//! Bearer token verification against the identity provider's key set.

use crate::jwks::JwksCache;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use notewise_core::config::AuthSettings;
use notewise_core::{AppConfig, AppError, AppResult, AuthError, CallContext};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Identity proven by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The token's `sub` claim
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies bearer tokens and extracts the caller's user id.
///
/// Only the signature, expiry and subject are checked; audience and issuer
/// are not validated.
pub struct TokenVerifier {
    keys: Option<JwksCache>,
    algorithms: Vec<Algorithm>,
    leeway_secs: u64,
}

impl TokenVerifier {
    /// Build a verifier for the key set at `jwks_url`.
    ///
    /// A missing URL is not an error here: every [`TokenVerifier::verify`]
    /// call then fails with [`AuthError::MissingConfiguration`]. Unknown
    /// algorithm names are a configuration error.
    pub fn new(jwks_url: Option<&str>, settings: &AuthSettings) -> AppResult<Self> {
        let algorithms = settings
            .algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name).map_err(|_| {
                    AppError::Config(format!("Unsupported token algorithm: {}", name))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        if algorithms.is_empty() {
            return Err(AppError::Config(
                "auth.algorithms must name at least one algorithm".to_string(),
            ));
        }

        let keys = jwks_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| {
                JwksCache::new(
                    url,
                    Duration::from_secs(settings.cache_ttl_secs),
                    Duration::from_secs(settings.min_refresh_interval_secs),
                )
            });

        Ok(Self {
            keys,
            algorithms,
            leeway_secs: settings.leeway_secs,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(config.jwks_url.as_deref(), &config.auth)
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Verify `token` and return the identity it asserts.
    ///
    /// Verification failures are [`AppError::Auth`], including a key-set
    /// fetch that times out. Only a cancelled `ctx` surfaces as `Cancelled`.
    pub async fn verify(&self, token: &str, ctx: &CallContext) -> AppResult<VerifiedIdentity> {
        let result = self.verify_inner(token, ctx).await;

        if let Err(AppError::Auth(e)) = &result {
            tracing::warn!(kind = e.kind(), "Token verification failed: {}", e);
        }

        result
    }

    async fn verify_inner(&self, token: &str, ctx: &CallContext) -> AppResult<VerifiedIdentity> {
        let Some(keys) = &self.keys else {
            return Err(AuthError::MissingConfiguration.into());
        };

        let header = decode_header(token)
            .map_err(|e| AuthError::MalformedToken(format!("unreadable header: {}", e)))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::MalformedToken(format!(
                "algorithm {:?} is not accepted",
                header.alg
            ))
            .into());
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::MalformedToken("header has no key id".to_string()))?;

        let validation = self.validation(header.alg);
        let key = keys.key_for(&kid, ctx).await?;

        match decode_claims(token, &key, &validation) {
            // The provider may have rotated this kid to a new key
            Err(AuthError::InvalidSignature) => match keys.refresh_for(&kid, ctx).await? {
                Some(refreshed) => Ok(decode_claims(token, &refreshed, &validation)?),
                None => Err(AuthError::InvalidSignature.into()),
            },
            other => Ok(other?),
        }
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

fn decode_claims(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<VerifiedIdentity, AuthError> {
    let data = decode::<Claims>(token, key, validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken(e.to_string()),
    })?;

    if data.claims.sub.is_empty() {
        return Err(AuthError::MalformedToken("empty subject".to_string()));
    }

    Ok(VerifiedIdentity {
        user_id: data.claims.sub,
    })
}
