//! Vector store abstraction for knowledge chunks.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::types::{EmbeddedChunk, ScoredChunk, StoreStats};
use notewise_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for vector store backends.
///
/// Every vector passed in or stored must have exactly
/// [`VectorStore::dimensions`] values. Search results are ordered by
/// descending score; equal scores keep insertion order.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and stats ("sqlite", "memory")
    fn backend(&self) -> &str;

    /// Table (or collection) name
    fn table(&self) -> &str;

    /// Embedding dimensions this store was opened with.
    fn dimensions(&self) -> usize;

    /// Append chunks. Returns the number written.
    async fn add(&self, chunks: Vec<EmbeddedChunk>) -> AppResult<usize>;

    /// Return up to `k` chunks most similar to `query`.
    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Number of stored chunks.
    async fn count(&self) -> AppResult<usize>;

    /// Remove every chunk.
    async fn clear(&self) -> AppResult<()>;

    async fn stats(&self) -> AppResult<StoreStats> {
        Ok(StoreStats {
            backend: self.backend().to_string(),
            table: self.table().to_string(),
            dimensions: self.dimensions(),
            chunks: self.count().await?,
        })
    }
}

/// Open the store named by a connection string.
///
/// `memory` selects the in-process store; anything else is a SQLite path,
/// optionally prefixed with `sqlite://`.
pub fn open_store(
    database_url: &str,
    table: &str,
    dimensions: usize,
) -> AppResult<Arc<dyn VectorStore>> {
    match StoreLocation::parse(database_url)? {
        StoreLocation::Memory => Ok(Arc::new(MemoryVectorStore::new(table, dimensions))),
        StoreLocation::Sqlite(path) => {
            Ok(Arc::new(SqliteVectorStore::open(path, table, dimensions)?))
        }
    }
}

/// Drop `table` from the store named by `database_url`, forgetting its
/// recorded dimension. A no-op for the in-process store.
pub fn drop_store(database_url: &str, table: &str) -> AppResult<()> {
    match StoreLocation::parse(database_url)? {
        StoreLocation::Memory => Ok(()),
        StoreLocation::Sqlite(path) => SqliteVectorStore::drop_table(path, table),
    }
}

enum StoreLocation<'a> {
    Memory,
    Sqlite(&'a str),
}

impl<'a> StoreLocation<'a> {
    fn parse(database_url: &'a str) -> AppResult<Self> {
        let url = database_url.trim();
        if url.is_empty() {
            return Err(AppError::Config(
                "database connection string is empty".to_string(),
            ));
        }

        if url.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }

        Ok(Self::Sqlite(url.strip_prefix("sqlite://").unwrap_or(url)))
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort descending by score, keeping the existing order for ties, and cut
/// to `k`. Missing and non-finite scores sort last.
pub fn rank(results: &mut Vec<ScoredChunk>, k: usize) {
    results.sort_by(|a, b| rank_key(b).total_cmp(&rank_key(a)));
    results.truncate(k);
}

fn rank_key(result: &ScoredChunk) -> f32 {
    result
        .score
        .filter(|s| s.is_finite())
        .unwrap_or(f32::NEG_INFINITY)
}

fn check_vector(values: &[f32], expected: usize, what: &str) -> AppResult<()> {
    if values.len() != expected {
        return Err(AppError::Store(format!(
            "{} has {} dimensions, store expects {}",
            what,
            values.len(),
            expected
        )));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(AppError::Store(format!(
            "{} has a non-finite component at index {}",
            what, i
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnowledgeChunk;

    fn scored(id: &str, score: Option<f32>) -> ScoredChunk {
        ScoredChunk {
            chunk: KnowledgeChunk {
                id: id.to_string(),
                text: id.to_string(),
                metadata: serde_json::Value::Null,
            },
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_is_stable_and_bounded() {
        let mut results = vec![
            scored("low", Some(0.1)),
            scored("tie-first", Some(0.5)),
            scored("none", None),
            scored("tie-second", Some(0.5)),
            scored("high", Some(0.9)),
        ];

        rank(&mut results, 3);

        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "tie-first", "tie-second"]);
    }

    #[test]
    fn test_rank_puts_non_finite_scores_last() {
        let mut results = vec![
            scored("low", Some(0.1)),
            scored("nan", Some(f32::NAN)),
            scored("none", None),
            scored("inf", Some(f32::INFINITY)),
            scored("high", Some(0.9)),
        ];

        rank(&mut results, 2);

        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[test]
    fn test_check_vector() {
        assert!(check_vector(&[0.5, 1.0], 2, "query").is_ok());
        assert!(matches!(check_vector(&[0.5], 2, "query"), Err(AppError::Store(_))));
        assert!(matches!(
            check_vector(&[f32::INFINITY, 1.0], 2, "query"),
            Err(AppError::Store(_))
        ));
        assert!(matches!(
            check_vector(&[f32::NAN, 1.0], 2, "query"),
            Err(AppError::Store(_))
        ));
    }

    #[test]
    fn test_open_store_memory() {
        let store = open_store("memory", "notes", 8).unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.dimensions(), 8);
    }

    #[test]
    fn test_open_store_sqlite_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("kb.sqlite").display());
        let store = open_store(&url, "notes", 8).unwrap();
        assert_eq!(store.backend(), "sqlite");
    }

    #[test]
    fn test_drop_store_allows_new_dimensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = dir.path().join("kb.sqlite").display().to_string();

        open_store(&url, "notes", 8).unwrap();
        assert!(matches!(open_store(&url, "notes", 16), Err(AppError::Config(_))));

        drop_store(&url, "notes").unwrap();
        assert_eq!(open_store(&url, "notes", 16).unwrap().dimensions(), 16);
        drop_store("memory", "notes").unwrap();
    }

    #[test]
    fn test_open_store_rejects_blank_url() {
        assert!(matches!(open_store("  ", "notes", 8), Err(AppError::Config(_))));
    }
}
