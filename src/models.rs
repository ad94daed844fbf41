//! Core data types used throughout Hindsight.
//!
//! These types represent the history records, indexed chunks, and answer
//! payloads that flow through the ingestion and question pipeline.

use serde::{Deserialize, Deserializer, Serialize};

/// One browsing-history record as submitted by the collector.
///
/// Records are immutable after ingestion; a superseded record is replaced
/// wholesale (delete-then-add) under its stable identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// Visit timestamp in epoch milliseconds.
    #[serde(rename = "lastVisitTime")]
    pub last_visit_time: f64,
    pub title: String,
    pub url: String,
    pub domain: String,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: i64,
    /// Hour of day in [0, 24).
    pub hour: u32,
    #[serde(rename = "collectedAt")]
    pub collected_at: f64,
    #[serde(default)]
    pub extracted_content: Option<ExtractedContent>,
}

/// A batch of history records, optionally scoped to a user.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryBatch {
    pub items: Vec<HistoryRecord>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Media metadata extracted by the collector for a visited page.
///
/// This is the closed set of keys the pipeline recognizes. A key that is
/// absent and a key that is present with an empty string are treated the
/// same everywhere: the field is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_song: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Arrives as either a string or a number on the wire.
    #[serde(
        default,
        deserialize_with = "de_stringish",
        skip_serializing_if = "Option::is_none"
    )]
    pub release_year: Option<String>,
}

/// Returns the field value only when it is present and non-empty.
pub(crate) fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn de_stringish<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}

/// Canonical metadata carried by every indexed chunk.
///
/// Derived once from a [`HistoryRecord`] at ingestion time; retrieval
/// filtering only ever consults these fields, never the chunk text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMeta {
    pub record_id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub day_of_week: i64,
    pub hour: u32,
    /// `YYYY-MM-DD`.
    pub visit_date: String,
    /// Weekday name, e.g. `Tuesday`.
    pub day_name: String,
    pub time_period: String,
    pub content_category: String,
    pub extracted: Option<ExtractedContent>,
}

/// A similarity-search hit: chunk text plus its metadata.
///
/// The position in the returned list is the similarity rank; after
/// filtering, the surviving positions become 1-based citation numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub meta: ChunkMeta,
}

/// A cited source in an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
    /// Space-joined `visit_date day_name time_period`.
    pub meta: String,
}

/// Response payload for a question.
///
/// An empty result is not an error: `success` stays `true` and `answer`
/// explains which filters matched nothing.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl AskResponse {
    pub fn empty(answer: impl Into<String>) -> Self {
        Self {
            success: true,
            answer: answer.into(),
            sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_content_accepts_numeric_release_year() {
        let c: ExtractedContent =
            serde_json::from_str(r#"{"track_name":"Song","release_year":2019}"#).unwrap();
        assert_eq!(c.release_year.as_deref(), Some("2019"));

        let c: ExtractedContent = serde_json::from_str(r#"{"release_year":"2019"}"#).unwrap();
        assert_eq!(c.release_year.as_deref(), Some("2019"));
    }

    #[test]
    fn nonempty_distinguishes_absent_and_blank() {
        assert_eq!(nonempty(&None), None);
        assert_eq!(nonempty(&Some(String::new())), None);
        assert_eq!(nonempty(&Some("x".to_string())), Some("x"));
    }

    #[test]
    fn history_record_parses_collector_field_names() {
        let json = r#"{
            "id": "42",
            "lastVisitTime": 1721980800000.0,
            "title": "Example",
            "url": "https://example.com/",
            "domain": "example.com",
            "dayOfWeek": 2,
            "hour": 14,
            "collectedAt": 1721984400000.0
        }"#;
        let rec: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.hour, 14);
        assert!(rec.extracted_content.is_none());
    }
}
