//! In-process vector store.

use super::{check_vector, cosine_similarity, rank, VectorStore};
use crate::types::{EmbeddedChunk, KnowledgeChunk, ScoredChunk};
use notewise_core::AppResult;
use tokio::sync::RwLock;

/// Vector store held entirely in memory. Contents vanish with the process.
pub struct MemoryVectorStore {
    table: String,
    dimensions: usize,
    rows: RwLock<Vec<(KnowledgeChunk, Vec<f32>)>>,
}

impl MemoryVectorStore {
    pub fn new(table: impl Into<String>, dimensions: usize) -> Self {
        Self {
            table: table.into(),
            dimensions,
            rows: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn add(&self, chunks: Vec<EmbeddedChunk>) -> AppResult<usize> {
        for item in &chunks {
            check_vector(&item.embedding, self.dimensions, "chunk embedding")?;
        }

        let written = chunks.len();
        let mut rows = self.rows.write().await;
        rows.extend(chunks.into_iter().map(|c| (c.chunk, c.embedding)));
        Ok(written)
    }

    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        check_vector(query, self.dimensions, "query vector")?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self.rows.read().await;
        let mut results: Vec<ScoredChunk> = rows
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: Some(cosine_similarity(query, embedding)),
            })
            .collect();

        rank(&mut results, k);
        Ok(results)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn clear(&self) -> AppResult<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewise_core::AppError;

    fn embedded(id: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: KnowledgeChunk {
                id: id.to_string(),
                text: format!("text of {id}"),
                metadata: serde_json::json!({"source_path": format!("/notes/{id}.md")}),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let store = MemoryVectorStore::new("notes", 3);
        store
            .add(vec![
                embedded("x", vec![1.0, 0.0, 0.0]),
                embedded("y", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "x");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryVectorStore::new("notes", 2);
        store
            .add(vec![
                embedded("first", vec![1.0, 0.0]),
                embedded("second", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.id, "first");
        assert_eq!(results[1].chunk.id, "second");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = MemoryVectorStore::new("notes", 3);
        let add = store.add(vec![embedded("bad", vec![1.0])]).await;
        assert!(matches!(add, Err(AppError::Store(_))));

        let search = store.search(&[1.0, 0.0], 1).await;
        assert!(matches!(search, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_non_finite_vectors_rejected() {
        let store = MemoryVectorStore::new("notes", 2);
        store
            .add(vec![
                embedded("low", vec![0.1, 1.0]),
                embedded("high", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let add = store.add(vec![embedded("inf", vec![f32::INFINITY, 1.0])]).await;
        assert!(matches!(add, Err(AppError::Store(_))));
        assert_eq!(store.count().await.unwrap(), 2);

        let search = store.search(&[f32::NAN, 0.0], 1).await;
        assert!(matches!(search, Err(AppError::Store(_))));

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.id, "high");
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let store = MemoryVectorStore::new("notes", 2);
        store.add(vec![embedded("a", vec![1.0, 1.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[1.0, 1.0], 3).await.unwrap().is_empty());
    }
}
