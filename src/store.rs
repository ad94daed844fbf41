//! Vector store abstraction and backends.
//!
//! The [`Store`] trait is the pipeline's only view of persistence: named
//! collections of embedded chunks supporting add, get-by-record,
//! similarity query, delete, and clear, plus a separate table for distilled
//! memory entries. Collections are addressed by name; the per-user naming
//! scheme lives in [`history_collection`] / [`memory_collection`] so callers
//! never build collection strings ad hoc.
//!
//! Two backends: [`SqliteStore`] (WAL-mode SQLite; vectors as little-endian
//! f32 BLOBs, similarity computed in Rust) and [`MemStore`] (brute-force
//! in-memory, for tests).

use std::str::FromStr;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::Config;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Candidate, ChunkMeta};

/// Strips a requested user id down to `[A-Za-z0-9_-]`, falling back to
/// `local_user` when nothing usable remains.
pub fn sanitize_user_id(raw: Option<&str>) -> String {
    if let Some(raw) = raw {
        let safe: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if !safe.is_empty() {
            return safe;
        }
    }
    "local_user".to_string()
}

pub fn history_collection(user_id: &str) -> String {
    format!("history:{}", user_id)
}

pub fn memory_collection(user_id: &str) -> String {
    format!("memory:{}", user_id)
}

/// A chunk row ready for insertion.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub meta: ChunkMeta,
}

/// A distilled memory entry.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub user_id: String,
    /// RFC 3339 timestamp of distillation.
    pub created_at: String,
}

/// Persistence backend for embedded chunks and memory entries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert chunk rows into a collection.
    async fn add(&self, collection: &str, chunks: &[StoredChunk]) -> Result<()>;

    /// Fetch all chunks belonging to one record, in insertion order.
    async fn get(&self, collection: &str, record_id: &str) -> Result<Vec<Candidate>>;

    /// Top-`k` chunks by cosine similarity to `embedding`, best first.
    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Candidate>>;

    /// Delete all chunks belonging to one record. Returns rows removed.
    async fn delete_record(&self, collection: &str, record_id: &str) -> Result<u64>;

    /// Delete every chunk in a collection. Returns rows removed.
    async fn clear(&self, collection: &str) -> Result<u64>;

    /// Append a distilled memory entry to a memory collection.
    async fn add_memory(&self, collection: &str, entry: &MemoryEntry) -> Result<()>;
}

// ============ SQLite backend ============

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at the configured path.
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = &config.db.path;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the schema. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                record_id TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                domain TEXT NOT NULL,
                day_of_week INTEGER NOT NULL,
                hour INTEGER NOT NULL,
                visit_date TEXT NOT NULL,
                day_name TEXT NOT NULL,
                time_period TEXT NOT NULL,
                content_category TEXT NOT NULL,
                extracted_json TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_record ON chunks(collection, record_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_collection ON memories(collection)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_candidate(row: &sqlx::sqlite::SqliteRow) -> Candidate {
    let extracted_json: Option<String> = row.get("extracted_json");
    Candidate {
        text: row.get("text"),
        meta: ChunkMeta {
            record_id: row.get("record_id"),
            title: row.get("title"),
            url: row.get("url"),
            domain: row.get("domain"),
            day_of_week: row.get("day_of_week"),
            hour: row.get::<i64, _>("hour") as u32,
            visit_date: row.get("visit_date"),
            day_name: row.get("day_name"),
            time_period: row.get("time_period"),
            content_category: row.get("content_category"),
            extracted: extracted_json.and_then(|j| serde_json::from_str(&j).ok()),
        },
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn add(&self, collection: &str, chunks: &[StoredChunk]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            let extracted_json = chunk
                .meta
                .extracted
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO chunks
                    (id, collection, record_id, text, embedding, title, url, domain,
                     day_of_week, hour, visit_date, day_name, time_period,
                     content_category, extracted_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(collection)
            .bind(&chunk.meta.record_id)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(&chunk.meta.title)
            .bind(&chunk.meta.url)
            .bind(&chunk.meta.domain)
            .bind(chunk.meta.day_of_week)
            .bind(chunk.meta.hour as i64)
            .bind(&chunk.meta.visit_date)
            .bind(&chunk.meta.day_name)
            .bind(&chunk.meta.time_period)
            .bind(&chunk.meta.content_category)
            .bind(extracted_json)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: &str, record_id: &str) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            "SELECT * FROM chunks WHERE collection = ? AND record_id = ? ORDER BY rowid",
        )
        .bind(collection)
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_candidate).collect())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Candidate>> {
        // Brute-force scan: fetch the collection's vectors and rank by cosine
        // similarity in Rust. Row order is pinned so that equal scores keep a
        // deterministic order under the stable sort.
        let rows = sqlx::query("SELECT * FROM chunks WHERE collection = ? ORDER BY rowid")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f32, Candidate)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                (cosine_similarity(embedding, &vec), row_to_candidate(row))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    async fn delete_record(&self, collection: &str, record_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE collection = ? AND record_id = ?")
            .bind(collection)
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear(&self, collection: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn add_memory(&self, collection: &str, entry: &MemoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO memories (id, collection, text, embedding, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(collection)
        .bind(&entry.text)
        .bind(vec_to_blob(&entry.embedding))
        .bind(&entry.user_id)
        .bind(&entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ============ In-memory backend ============

/// Brute-force in-memory store for tests.
#[derive(Default)]
pub struct MemStore {
    chunks: RwLock<Vec<(String, StoredChunk)>>,
    memories: RwLock<Vec<(String, MemoryEntry)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory_count(&self, collection: &str) -> usize {
        self.memories
            .read()
            .expect("memories lock")
            .iter()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

fn chunk_to_candidate(chunk: &StoredChunk) -> Candidate {
    Candidate {
        text: chunk.text.clone(),
        meta: chunk.meta.clone(),
    }
}

#[async_trait]
impl Store for MemStore {
    async fn add(&self, collection: &str, chunks: &[StoredChunk]) -> Result<()> {
        let mut rows = self.chunks.write().expect("chunks lock");
        for chunk in chunks {
            rows.push((collection.to_string(), chunk.clone()));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, record_id: &str) -> Result<Vec<Candidate>> {
        let rows = self.chunks.read().expect("chunks lock");
        Ok(rows
            .iter()
            .filter(|(c, chunk)| c == collection && chunk.meta.record_id == record_id)
            .map(|(_, chunk)| chunk_to_candidate(chunk))
            .collect())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Candidate>> {
        let rows = self.chunks.read().expect("chunks lock");
        let mut scored: Vec<(f32, Candidate)> = rows
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, chunk)| {
                (
                    cosine_similarity(embedding, &chunk.embedding),
                    chunk_to_candidate(chunk),
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    async fn delete_record(&self, collection: &str, record_id: &str) -> Result<u64> {
        let mut rows = self.chunks.write().expect("chunks lock");
        let before = rows.len();
        rows.retain(|(c, chunk)| !(c == collection && chunk.meta.record_id == record_id));
        Ok((before - rows.len()) as u64)
    }

    async fn clear(&self, collection: &str) -> Result<u64> {
        let mut rows = self.chunks.write().expect("chunks lock");
        let before = rows.len();
        rows.retain(|(c, _)| c != collection);
        Ok((before - rows.len()) as u64)
    }

    async fn add_memory(&self, collection: &str, entry: &MemoryEntry) -> Result<()> {
        let mut rows = self.memories.write().expect("memories lock");
        rows.push((collection.to_string(), entry.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMeta;

    fn meta(record_id: &str, title: &str) -> ChunkMeta {
        ChunkMeta {
            record_id: record_id.to_string(),
            title: title.to_string(),
            url: "https://example.com/".to_string(),
            domain: "example.com".to_string(),
            day_of_week: 1,
            hour: 9,
            visit_date: "2024-07-22".to_string(),
            day_name: "Monday".to_string(),
            time_period: "Morning".to_string(),
            content_category: "General".to_string(),
            extracted: None,
        }
    }

    fn chunk(id: &str, record_id: &str, title: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            text: format!("Title: {}", title),
            embedding,
            meta: meta(record_id, title),
        }
    }

    #[test]
    fn user_ids_are_sanitized() {
        assert_eq!(sanitize_user_id(Some("alice-42")), "alice-42");
        assert_eq!(sanitize_user_id(Some("a b/c!")), "abc");
        assert_eq!(sanitize_user_id(Some("!!!")), "local_user");
        assert_eq!(sanitize_user_id(None), "local_user");
    }

    #[test]
    fn collection_names_are_scoped_per_user() {
        assert_eq!(history_collection("alice"), "history:alice");
        assert_eq!(memory_collection("alice"), "memory:alice");
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let store = MemStore::new();
        store
            .add(
                "history:t",
                &[
                    chunk("c1", "r1", "Far", vec![0.0, 1.0]),
                    chunk("c2", "r2", "Near", vec![1.0, 0.1]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("history:t", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].meta.title, "Near");
        assert_eq!(hits[1].meta.title, "Far");
    }

    #[tokio::test]
    async fn query_respects_k_and_collection_scope() {
        let store = MemStore::new();
        store
            .add("history:a", &[chunk("c1", "r1", "Mine", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .add("history:b", &[chunk("c2", "r2", "Other", vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.query("history:a", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.title, "Mine");
    }

    #[tokio::test]
    async fn delete_record_removes_only_that_record() {
        let store = MemStore::new();
        store
            .add(
                "history:t",
                &[
                    chunk("c1", "r1", "One", vec![1.0]),
                    chunk("c2", "r1", "One cont.", vec![1.0]),
                    chunk("c3", "r2", "Two", vec![1.0]),
                ],
            )
            .await
            .unwrap();

        let removed = store.delete_record("history:t", "r1").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get("history:t", "r2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_collection() {
        let store = MemStore::new();
        store
            .add("history:t", &[chunk("c1", "r1", "One", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.clear("history:t").await.unwrap(), 1);
        assert!(store.query("history:t", &[1.0], 10).await.unwrap().is_empty());
    }
}
