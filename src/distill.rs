//! Memory distillation: condensing a question/answer exchange into a
//! durable fact stored in the user's memory collection.
//!
//! This runs fire-and-forget after an answer is produced. Every failure —
//! completion, embedding, storage — is logged and swallowed; nothing here
//! may propagate to the caller. The model opts out of storage by replying
//! with the NONE sentinel.

use chrono::Utc;
use tracing::debug;

use crate::chat::{self, ChatMessage};
use crate::config::Config;
use crate::embedding;
use crate::store::{memory_collection, MemoryEntry, Store};

const DISTILL_PROMPT: &str = "Condense user preference or a durable fact from the exchange \
in <= 2 short sentences. If nothing durable, reply with 'NONE'.";

/// Accepts the model output only when it holds a durable fact.
fn durable_summary(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.to_uppercase().starts_with("NONE") {
        return None;
    }
    Some(raw)
}

/// Distills the exchange and stores the result, if any.
pub async fn distill_and_store(
    config: &Config,
    store: &dyn Store,
    user_id: &str,
    question: &str,
    answer: &str,
) {
    let messages = [
        ChatMessage::system(DISTILL_PROMPT),
        ChatMessage::user(format!("Q: {}\nA: {}", question, answer)),
    ];

    let raw = match chat::complete(&config.chat, &messages).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "memory distillation skipped: completion failed");
            return;
        }
    };

    let summary = match durable_summary(&raw) {
        Some(summary) => summary.to_string(),
        None => return,
    };

    let provider = match embedding::create_provider(&config.embedding) {
        Ok(provider) => provider,
        Err(e) => {
            debug!(error = %e, "memory distillation skipped: no embedding provider");
            return;
        }
    };
    let vectors = match embedding::embed_texts(
        provider.as_ref(),
        &config.embedding,
        &[summary.clone()],
    )
    .await
    {
        Ok(vectors) => vectors,
        Err(e) => {
            debug!(error = %e, "memory distillation skipped: embedding failed");
            return;
        }
    };
    let Some(vector) = vectors.into_iter().next() else {
        return;
    };

    let now = Utc::now();
    let entry = MemoryEntry {
        id: format!("mem:{}", now.timestamp()),
        text: summary,
        embedding: vector,
        user_id: user_id.to_string(),
        created_at: now.to_rfc3339(),
    };

    if let Err(e) = store.add_memory(&memory_collection(user_id), &entry).await {
        debug!(error = %e, "memory distillation skipped: store write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_sentinel_is_not_durable() {
        assert_eq!(durable_summary("NONE"), None);
        assert_eq!(durable_summary("none."), None);
        assert_eq!(durable_summary("  None — nothing here"), None);
        assert_eq!(durable_summary(""), None);
        assert_eq!(durable_summary("   "), None);
    }

    #[test]
    fn facts_pass_through_unchanged() {
        let raw = "User prefers piano covers.\n";
        assert_eq!(durable_summary(raw), Some(raw));
    }
}
