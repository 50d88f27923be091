//! SQLite-backed vector store.
//!
//! Embeddings are stored as little-endian `f32` blobs and searched with a
//! full cosine-similarity scan. Each table's dimension is recorded in
//! `notewise_tables` so a mismatched embedder is caught when the store is
//! opened, not at the first query.

use super::{check_vector, cosine_similarity, rank, VectorStore};
use crate::types::{EmbeddedChunk, KnowledgeChunk, ScoredChunk};
use notewise_core::config::validate_identifier;
use notewise_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const REGISTRY_TABLE: &str = "notewise_tables";

/// Vector store in a single SQLite table.
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open (creating if needed) `table` in the database at `path`.
    ///
    /// Fails with [`AppError::Config`] when the table was created for a
    /// different embedding dimension.
    pub fn open(path: impl AsRef<Path>, table: &str, dimensions: usize) -> AppResult<Self> {
        validate_identifier(table)?;
        let conn = connect(path.as_ref())?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {REGISTRY_TABLE} (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_seq ON {table}(seq);
            "#
        ))
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        let recorded: Option<i64> = conn
            .query_row(
                &format!("SELECT dimensions FROM {REGISTRY_TABLE} WHERE name = ?1"),
                params![table],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to read table registry: {}", e)))?;

        match recorded {
            Some(existing) if existing as usize != dimensions => {
                return Err(AppError::Config(format!(
                    "Table '{}' holds {}-dimensional embeddings but the embedding provider \
                     produces {}; run `notewise clean` and re-ingest, or fix embedding.dimensions",
                    table, existing, dimensions
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    &format!("INSERT INTO {REGISTRY_TABLE} (name, dimensions) VALUES (?1, ?2)"),
                    params![table, dimensions as i64],
                )
                .map_err(|e| AppError::Store(format!("Failed to register table: {}", e)))?;
            }
        }

        tracing::debug!(table, dimensions, "Opened SQLite vector store at {:?}", path.as_ref());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            dimensions,
        })
    }

    /// Drop `table` and forget its recorded dimension.
    ///
    /// This is how a store is rebuilt for a different embedding model.
    pub fn drop_table(path: impl AsRef<Path>, table: &str) -> AppResult<()> {
        validate_identifier(table)?;
        let conn = connect(path.as_ref())?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {REGISTRY_TABLE} (name TEXT PRIMARY KEY, dimensions INTEGER NOT NULL);
             DROP TABLE IF EXISTS {table};"
        ))
        .map_err(|e| AppError::Store(format!("Failed to drop table '{}': {}", table, e)))?;

        conn.execute(
            &format!("DELETE FROM {REGISTRY_TABLE} WHERE name = ?1"),
            params![table],
        )
        .map_err(|e| AppError::Store(format!("Failed to update table registry: {}", e)))?;

        tracing::info!(table, "Dropped vector table");
        Ok(())
    }

    /// Run blocking SQLite work off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection, &str) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::Store("SQLite connection lock poisoned".to_string()))?;
            f(&mut guard, &table)
        })
        .await
        .map_err(|e| AppError::Store(format!("SQLite task failed: {}", e)))?
    }
}

fn connect(path: &Path) -> AppResult<Connection> {
    if path != Path::new(":memory:") {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    Connection::open(path)
        .map_err(|e| AppError::Store(format!("Failed to open SQLite database {:?}: {}", path, e)))
}

#[async_trait::async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &str {
        "sqlite"
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

        self.with_conn(move |conn, table| {
            let tx = conn
                .transaction()
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

            let mut seq: i64 = tx
                .query_row(&format!("SELECT COALESCE(MAX(seq), 0) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .map_err(|e| AppError::Store(format!("Failed to read sequence: {}", e)))?;

            {
                let mut stmt = tx
                    .prepare(&format!(
                        "INSERT INTO {table} (id, seq, embedding, text, metadata) VALUES (?1, ?2, ?3, ?4, ?5)"
                    ))
                    .map_err(|e| AppError::Store(format!("Failed to prepare insert: {}", e)))?;

                for item in &chunks {
                    seq += 1;
                    let metadata = serde_json::to_string(&item.chunk.metadata)?;
                    stmt.execute(params![
                        item.chunk.id,
                        seq,
                        embedding_to_bytes(&item.embedding),
                        item.chunk.text,
                        metadata,
                    ])
                    .map_err(|e| AppError::Store(format!("Failed to insert chunk: {}", e)))?;
                }
            }

            tx.commit()
                .map_err(|e| AppError::Store(format!("Failed to commit chunks: {}", e)))?;

            Ok(chunks.len())
        })
        .await
    }

    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        check_vector(query, self.dimensions, "query vector")?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = query.to_vec();
        let dimensions = self.dimensions;

        self.with_conn(move |conn, table| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT id, text, metadata, embedding FROM {table} ORDER BY seq"
                ))
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                })
                .map_err(|e| AppError::Store(format!("Failed to query chunks: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                let (id, text, metadata, blob) =
                    row.map_err(|e| AppError::Store(format!("Failed to read chunk: {}", e)))?;

                let embedding = bytes_to_embedding(&blob)?;
                check_vector(&embedding, dimensions, "stored embedding")?;

                results.push(ScoredChunk {
                    score: Some(cosine_similarity(&query, &embedding)),
                    chunk: KnowledgeChunk {
                        id,
                        text,
                        metadata: serde_json::from_str(&metadata)?,
                    },
                });
            }

            rank(&mut results, k);

            tracing::debug!("Retrieved {} chunks (requested top-{})", results.len(), k);
            Ok(results)
        })
        .await
    }

    async fn count(&self) -> AppResult<usize> {
        self.with_conn(|conn, table| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .map_err(|e| AppError::Store(format!("Failed to count chunks: {}", e)))
        })
        .await
    }

    async fn clear(&self) -> AppResult<()> {
        self.with_conn(|conn, table| {
            conn.execute(&format!("DELETE FROM {table}"), [])
                .map_err(|e| AppError::Store(format!("Failed to delete chunks: {}", e)))?;
            tracing::info!(table, "Cleared vector store");
            Ok(())
        })
        .await
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
