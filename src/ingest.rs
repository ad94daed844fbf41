//! Batch ingestion: records → canonical text → chunks → embeddings → store.
//!
//! Every record gets a stable identifier derived from domain, visit day,
//! and a hash of the URL, so re-submitting a record replaces its previous
//! chunks (delete-then-add) instead of duplicating them. Embedding happens
//! before any deletion, so a provider failure leaves the collection as it
//! was.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chunk::split_text;
use crate::config::Config;
use crate::embedding;
use crate::models::{ChunkMeta, HistoryBatch};
use crate::normalize::{canonical_text, record_meta, visit_datetime};
use crate::store::{history_collection, sanitize_user_id, Store, StoredChunk};

/// Counters reported after an ingest run.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub user_id: String,
    pub items: usize,
    pub chunks_written: usize,
    pub replaced: u64,
}

/// Stable identifier for a record: `hist:{domain}:{visit-date}:{url-hash}`.
///
/// Deterministic, and collides only for records sharing domain, calendar
/// day, and URL — exactly the identity under which a record is replaced.
pub fn stable_record_id(domain: &str, last_visit_time: f64, url: &str) -> String {
    let visit_date = visit_datetime(last_visit_time).format("%Y-%m-%d");

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let bucket = u64::from_le_bytes(head) % 1_000_000_000;

    format!("hist:{}:{}:{}", domain, visit_date, bucket)
}

struct Prepared {
    record_id: String,
    meta: ChunkMeta,
    spans: Vec<String>,
}

/// Ingest a batch into the user's history collection.
///
/// With `rebuild`, the whole collection is dropped and rebuilt from the
/// batch; otherwise each record is upserted under its stable identifier.
/// With `dry_run`, nothing is embedded or written — only counts come back.
pub async fn run_ingest(
    config: &Config,
    store: &dyn Store,
    batch: &HistoryBatch,
    rebuild: bool,
    dry_run: bool,
) -> Result<IngestSummary> {
    if batch.items.is_empty() {
        bail!("No items in batch");
    }

    let user_id = sanitize_user_id(batch.user_id.as_deref());
    let collection = history_collection(&user_id);

    let prepared: Vec<Prepared> = batch
        .items
        .iter()
        .map(|rec| {
            let record_id = stable_record_id(&rec.domain, rec.last_visit_time, &rec.url);
            let meta = record_meta(rec, &record_id);
            let spans = split_text(&canonical_text(rec), config.chunking.max_chars);
            Prepared {
                record_id,
                meta,
                spans,
            }
        })
        .collect();

    let total_chunks: usize = prepared.iter().map(|p| p.spans.len()).sum();

    if dry_run {
        return Ok(IngestSummary {
            user_id,
            items: batch.items.len(),
            chunks_written: total_chunks,
            replaced: 0,
        });
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;

    let texts: Vec<String> = prepared
        .iter()
        .flat_map(|p| p.spans.iter().cloned())
        .collect();

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch_texts in texts.chunks(config.embedding.batch_size) {
        let mut vecs =
            embedding::embed_texts(provider.as_ref(), &config.embedding, batch_texts).await?;
        vectors.append(&mut vecs);
    }
    if vectors.len() != texts.len() {
        bail!(
            "Embedding count mismatch: {} texts, {} vectors",
            texts.len(),
            vectors.len()
        );
    }

    let mut replaced = 0u64;
    if rebuild {
        replaced = store.clear(&collection).await?;
    } else {
        for p in &prepared {
            if !store.get(&collection, &p.record_id).await?.is_empty() {
                replaced += store.delete_record(&collection, &p.record_id).await?;
            }
        }
    }

    let mut rows = Vec::with_capacity(total_chunks);
    let mut vectors = vectors.into_iter();
    for p in &prepared {
        for span in &p.spans {
            let embedding = vectors
                .next()
                .ok_or_else(|| anyhow::anyhow!("Embedding batch ran short"))?;
            rows.push(StoredChunk {
                id: Uuid::new_v4().to_string(),
                text: span.clone(),
                embedding,
                meta: p.meta.clone(),
            });
        }
    }

    store.add(&collection, &rows).await?;

    Ok(IngestSummary {
        user_id,
        items: batch.items.len(),
        chunks_written: rows.len(),
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryRecord;
    use crate::store::MemStore;

    const TUESDAY_MS: f64 = 1_721_743_200_000.0;

    fn record(url: &str) -> HistoryRecord {
        HistoryRecord {
            id: "1".to_string(),
            last_visit_time: TUESDAY_MS,
            title: "Page".to_string(),
            url: url.to_string(),
            domain: "example.com".to_string(),
            day_of_week: 2,
            hour: 14,
            collected_at: TUESDAY_MS,
            extracted_content: None,
        }
    }

    #[test]
    fn stable_id_is_deterministic() {
        let a = stable_record_id("example.com", TUESDAY_MS, "https://example.com/a");
        let b = stable_record_id("example.com", TUESDAY_MS, "https://example.com/a");
        assert_eq!(a, b);
        assert!(a.starts_with("hist:example.com:2024-07-23:"));
    }

    #[test]
    fn stable_id_separates_url_day_and_domain() {
        let base = stable_record_id("example.com", TUESDAY_MS, "https://example.com/a");
        let other_url = stable_record_id("example.com", TUESDAY_MS, "https://example.com/b");
        let other_day =
            stable_record_id("example.com", TUESDAY_MS + 86_400_000.0, "https://example.com/a");
        let other_domain = stable_record_id("example.org", TUESDAY_MS, "https://example.com/a");
        assert_ne!(base, other_url);
        assert_ne!(base, other_day);
        assert_ne!(base, other_domain);
    }

    #[tokio::test]
    async fn dry_run_only_counts() {
        let config = Config {
            db: crate::config::DbConfig {
                path: "unused.sqlite".into(),
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
            chat: Default::default(),
            server: crate::config::ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        };
        let store = MemStore::new();
        let batch = HistoryBatch {
            items: vec![record("https://example.com/a"), record("https://example.com/b")],
            user_id: Some("tester".to_string()),
        };

        let summary = run_ingest(&config, &store, &batch, false, true).await.unwrap();
        assert_eq!(summary.items, 2);
        assert_eq!(summary.chunks_written, 2);
        assert!(store.get("history:tester", &stable_record_id(
            "example.com",
            TUESDAY_MS,
            "https://example.com/a"
        ))
        .await
        .unwrap()
        .is_empty());
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let config = Config {
            db: crate::config::DbConfig {
                path: "unused.sqlite".into(),
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
            chat: Default::default(),
            server: crate::config::ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        };
        let store = MemStore::new();
        let batch = HistoryBatch {
            items: vec![],
            user_id: None,
        };
        let err = run_ingest(&config, &store, &batch, false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No items"));
    }
}
