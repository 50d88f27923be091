//! Query-time retrieval: embed the query, search the store, rank.

use crate::embeddings::{ensure_dimensions, EmbeddingProvider};
use crate::store::{rank, VectorStore};
use crate::types::ScoredChunk;
use notewise_core::{AppError, AppResult, CallContext};
use std::sync::Arc;

/// Finds the chunks most similar to a query.
///
/// Provider and store failures come back as [`AppError::Retrieval`] (or
/// `Timeout`/`Cancelled`), never as an empty result.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Pair an embedder with a store. Their dimensions must agree.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> AppResult<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' produces {} dimensions but table '{}' stores {}",
                embedder.model_name(),
                embedder.dimensions(),
                store.table(),
                store.dimensions()
            )));
        }

        Ok(Self { embedder, store })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Return at most `k` chunks, best first; ties keep store order.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        ctx: &CallContext,
    ) -> AppResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = ctx
            .run("query embedding", self.embedder.embed(query))
            .await
            .map_err(AppError::into_retrieval)?;
        ensure_dimensions(std::slice::from_ref(&vector), self.embedder.dimensions())
            .map_err(AppError::into_retrieval)?;

        let mut results = ctx
            .run("vector search", self.store.search(&vector, k))
            .await
            .map_err(AppError::into_retrieval)?;

        rank(&mut results, k);

        tracing::debug!(
            results = results.len(),
            top_score = ?results.first().and_then(|r| r.score),
            "Retrieved chunks"
        );

        Ok(results)
    }
}
