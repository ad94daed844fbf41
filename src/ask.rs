//! Question pipeline orchestration.
//!
//! interpret → embed → similarity query (oversampled) → filter → compose.
//! The provider is created first so a missing credential surfaces before
//! any work; the full raw candidate batch is awaited before filtering —
//! nothing here is incremental or retried.

use anyhow::{bail, Result};
use chrono::Local;

use crate::compose;
use crate::config::Config;
use crate::embedding;
use crate::filter::{self, FilterOutcome};
use crate::models::AskResponse;
use crate::query;
use crate::store::{history_collection, sanitize_user_id, Store};

/// Answers one question against the user's history collection.
pub async fn run_ask(
    config: &Config,
    store: &dyn Store,
    user_id: Option<&str>,
    question: &str,
    top_k: usize,
) -> Result<AskResponse> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;

    let user_id = sanitize_user_id(user_id);
    let collection = history_collection(&user_id);

    let intent = query::interpret(question, Local::now().date_naive());

    let query_vec =
        embedding::embed_query(provider.as_ref(), &config.embedding, &intent.expanded).await?;
    let candidate_k = config.retrieval.oversample(top_k);
    let raw = store.query(&collection, &query_vec, candidate_k).await?;

    if raw.is_empty() {
        return Ok(AskResponse::empty("No matching history found."));
    }

    match filter::apply(&intent, question, raw, top_k) {
        FilterOutcome::Empty { answer } => Ok(AskResponse::empty(answer)),
        FilterOutcome::Results { candidates, artist } => {
            let answer = compose::compose_answer(question, &intent, artist.as_deref(), &candidates);
            let sources = compose::sources(&candidates);
            Ok(AskResponse {
                success: true,
                answer,
                sources,
            })
        }
    }
}
