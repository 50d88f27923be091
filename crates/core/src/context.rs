//! Per-call deadline and cancellation.
//!
//! Every suspension point that talks to an external service (key-set fetch,
//! embedding, vector search, generation) runs through [`CallContext::run`],
//! which maps an elapsed deadline to [`AppError::Timeout`] and a triggered
//! cancellation token to [`AppError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};

/// Deadline and cancellation handle passed down a request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CallContext {
    /// Context where each stage gets at most `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Context with no deadline (offline ingestion, tests).
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Attach an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run one stage under this context's deadline and cancellation.
    pub async fn run<F, T>(&self, stage: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled(stage.to_string()));
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(stage, ?limit, "stage exceeded its deadline");
                        Err(AppError::Timeout(stage.to_string()))
                    }
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled(stage.to_string())),
            result = bounded => result,
        }
    }
}
