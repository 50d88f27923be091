//! Time-to-live cache over a JWKS endpoint.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use notewise_core::{AppError, AppResult, AuthError, CallContext};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, DecodingKey>,
    /// Last successful fetch
    fetched_at: Option<Instant>,
    /// Last fetch attempt, successful or not
    attempted_at: Option<Instant>,
    last_error: Option<String>,
}

/// Public keys by key id.
///
/// Keys are refetched when the TTL has elapsed, when a token names an
/// unknown key id, or when a signature fails to verify (see
/// [`JwksCache::refresh_for`]). Refreshes are spaced at least
/// `min_refresh_interval` apart. If a refresh fails while keys are cached,
/// the stale keys keep being served.
pub struct JwksCache {
    url: String,
    http: reqwest::Client,
    ttl: Duration,
    min_refresh_interval: Duration,
    state: RwLock<CacheState>,
    /// Serialises fetches so concurrent misses trigger one request
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    pub fn new(url: impl Into<String>, ttl: Duration, min_refresh_interval: Duration) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            ttl,
            min_refresh_interval,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Key for `kid`, fetching the key set if it is missing or expired.
    pub async fn key_for(&self, kid: &str, ctx: &CallContext) -> AppResult<DecodingKey> {
        if let Some((key, fresh)) = self.lookup(kid).await {
            if fresh {
                return Ok(key);
            }
        }

        self.refresh(ctx).await?;

        self.lookup(kid)
            .await
            .map(|(key, _)| key)
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()).into())
    }

    /// Refetch after a signature failure. Returns the key now published for
    /// `kid` when a fetch actually happened, `None` when it was rate limited
    /// or failed.
    pub async fn refresh_for(&self, kid: &str, ctx: &CallContext) -> AppResult<Option<DecodingKey>> {
        if !self.refresh(ctx).await? {
            return Ok(None);
        }
        Ok(self.lookup(kid).await.map(|(key, _)| key))
    }

    /// Number of cached keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lookup(&self, kid: &str) -> Option<(DecodingKey, bool)> {
        let state = self.state.read().await;
        let fresh = state
            .fetched_at
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false);
        state.keys.get(kid).map(|key| (key.clone(), fresh))
    }

    /// Fetch the key set unless one was attempted within the minimum
    /// interval. Returns whether new keys were installed.
    async fn refresh(&self, ctx: &CallContext) -> AppResult<bool> {
        let _guard = self.refresh_lock.lock().await;

        {
            let state = self.state.read().await;
            let recently_attempted = state
                .attempted_at
                .map(|at| at.elapsed() < self.min_refresh_interval)
                .unwrap_or(false);

            if recently_attempted {
                if state.fetched_at.is_some() {
                    tracing::debug!(url = %self.url, "Key-set refresh rate limited");
                    return Ok(false);
                }
                let reason = state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "key set was never fetched".to_string());
                return Err(AuthError::ProviderUnavailable(reason).into());
            }
        }

        let result = ctx.run("key-set fetch", self.fetch()).await;

        // A cancelled caller says nothing about the provider
        if let Err(AppError::Cancelled(stage)) = &result {
            return Err(AppError::Cancelled(stage.clone()));
        }

        let mut state = self.state.write().await;
        state.attempted_at = Some(Instant::now());

        match result {
            Ok(keys) => {
                tracing::debug!(url = %self.url, keys = keys.len(), "Fetched key set");
                state.keys = keys;
                state.fetched_at = Some(Instant::now());
                state.last_error = None;
                Ok(true)
            }
            Err(e) => {
                let reason = match e {
                    AppError::Auth(AuthError::ProviderUnavailable(msg)) => msg,
                    other => other.to_string(),
                };
                state.last_error = Some(reason.clone());
                if state.fetched_at.is_some() {
                    tracing::warn!(url = %self.url, error = %reason, "Key-set refresh failed; using cached keys");
                    Ok(false)
                } else {
                    Err(AuthError::ProviderUnavailable(reason).into())
                }
            }
        }
    }

    async fn fetch(&self) -> AppResult<HashMap<String, DecodingKey>> {
        let unavailable = |msg: String| AppError::Auth(AuthError::ProviderUnavailable(msg));

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(format!("key-set request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("key-set endpoint returned {}", status)));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid key set: {}", e)))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::debug!("Ignoring key without kid");
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "Ignoring unusable key"),
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JWKS_A: &str = include_str!("../tests/fixtures/jwks_a.json");

    async fn server_with(body: &str, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fresh_keys_are_served_from_cache() {
        let server = server_with(JWKS_A, 1).await;
        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );
        let ctx = CallContext::unbounded();

        cache.key_for("key-a", &ctx).await.unwrap();
        cache.key_for("key-a", &ctx).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refresh_is_rate_limited() {
        let server = server_with(JWKS_A, 1).await;
        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(60),
        );
        let ctx = CallContext::unbounded();

        for _ in 0..3 {
            let result = cache.key_for("key-z", &ctx).await;
            assert!(matches!(
                result,
                Err(AppError::Auth(AuthError::UnknownKey(ref kid))) if kid == "key-z"
            ));
        }
    }

    #[tokio::test]
    async fn test_stale_keys_survive_failed_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_string(JWKS_A))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        // Zero TTL: every lookup finds the keys stale
        let cache = JwksCache::new(format!("{}/jwks", server.uri()), Duration::ZERO, Duration::ZERO);
        let ctx = CallContext::unbounded();

        cache.key_for("key-a", &ctx).await.unwrap();
        cache.key_for("key-a", &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_never_fetched_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );
        let ctx = CallContext::unbounded();

        for _ in 0..2 {
            let result = cache.key_for("key-a", &ctx).await;
            assert!(matches!(
                result,
                Err(AppError::Auth(AuthError::ProviderUnavailable(_)))
            ));
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(JWKS_A)
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );
        let ctx = CallContext::new(Duration::from_millis(50));

        // The retry inside the refresh interval reports the outage the same way
        for _ in 0..2 {
            let result = cache.key_for("key-a", &ctx).await;
            assert!(matches!(
                result,
                Err(AppError::Auth(AuthError::ProviderUnavailable(_)))
            ));
        }
    }

    #[tokio::test]
    async fn test_cancelled_fetch_does_not_count_as_attempt() {
        let server = server_with(JWKS_A, 1).await;
        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );

        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let cancelled = cache
            .key_for("key-a", &CallContext::unbounded().with_cancellation(token))
            .await;
        assert!(matches!(cancelled, Err(AppError::Cancelled(_))));

        assert!(cache.key_for("key-a", &CallContext::unbounded()).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_body_is_provider_unavailable() {
        let server = server_with("<html>not json</html>", 1).await;
        let cache = JwksCache::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );

        let result = cache.key_for("key-a", &CallContext::unbounded()).await;
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::ProviderUnavailable(_)))
        ));
    }
}
