//! Canonical text rendering for history records.
//!
//! Each record is rendered to one text block: a fixed set of header lines
//! followed by one line per populated extracted-content field, in a fixed
//! order. The block is what gets embedded; filtering never re-parses it —
//! the structured fields in [`ChunkMeta`] are derived here alongside it.

use chrono::{DateTime, TimeZone, Utc};

use crate::categorize::{content_category, time_period};
use crate::models::{nonempty, ChunkMeta, HistoryRecord};

/// Longest description excerpt carried into the canonical text.
const MAX_DESCRIPTION_CHARS: usize = 800;

/// Converts an epoch-milliseconds visit timestamp to a UTC datetime.
///
/// Out-of-range timestamps collapse to the epoch rather than failing the
/// whole batch.
pub fn visit_datetime(millis: f64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Derives the canonical chunk metadata for one record.
pub fn record_meta(rec: &HistoryRecord, record_id: &str) -> ChunkMeta {
    let visit = visit_datetime(rec.last_visit_time);
    ChunkMeta {
        record_id: record_id.to_string(),
        title: rec.title.clone(),
        url: rec.url.clone(),
        domain: rec.domain.clone(),
        day_of_week: rec.day_of_week,
        hour: rec.hour,
        visit_date: visit.format("%Y-%m-%d").to_string(),
        day_name: visit.format("%A").to_string(),
        time_period: time_period(rec.hour).to_string(),
        content_category: content_category(&rec.url, &rec.title).to_string(),
        extracted: rec.extracted_content.clone(),
    }
}

/// Renders the canonical text block for one record.
///
/// Header lines always appear; extracted-content lines are appended only
/// when the field is populated — missing fields are omitted entirely, never
/// emitted blank.
pub fn canonical_text(rec: &HistoryRecord) -> String {
    let visit = visit_datetime(rec.last_visit_time);

    let mut lines: Vec<String> = vec![
        format!("Title: {}", rec.title),
        format!("URL: {}", rec.url),
        format!("Domain: {}", rec.domain),
        format!("Visit Date: {}", visit.format("%B %d, %Y")),
        format!("Date: {}", visit.format("%Y-%m-%d")),
        format!("Day: {}", visit.format("%A")),
        format!("Time: {}:00", rec.hour),
        format!("Time Period: {}", time_period(rec.hour)),
        format!("Content Type: {}", content_category(&rec.url, &rec.title)),
    ];

    if let Some(content) = &rec.extracted_content {
        if let Some(v) = nonempty(&content.video_title) {
            lines.push(format!("Video Title: {}", v));
        }
        if let Some(v) = nonempty(&content.channel) {
            lines.push(format!("Channel/Artist: {}", v));
        }
        if let Some(v) = nonempty(&content.parsed_artist) {
            lines.push(format!("Artist: {}", v));
        }
        if let Some(v) = nonempty(&content.parsed_song) {
            lines.push(format!("Song: {}", v));
        }
        if let Some(v) = nonempty(&content.video_type) {
            lines.push(format!("Video Type: {}", v));
        }
        if content.collaboration == Some(true) {
            lines.push("Collaboration: Yes".to_string());
        }
        if let Some(v) = nonempty(&content.description) {
            let excerpt: String = v.chars().take(MAX_DESCRIPTION_CHARS).collect();
            lines.push(format!("Description: {}", excerpt));
        }
        if let Some(v) = nonempty(&content.contextual_keywords) {
            lines.push(format!("Context: {}", v));
        }
        if let Some(v) = nonempty(&content.track_name) {
            lines.push(format!("Song/Track: {}", v));
        }
        if let Some(v) = nonempty(&content.artist) {
            lines.push(format!("Artist: {}", v));
        }
        if let Some(v) = nonempty(&content.album) {
            lines.push(format!("Album: {}", v));
        }
        if let Some(v) = nonempty(&content.release_year) {
            lines.push(format!("Year: {}", v));
        }
    }

    lines.join("\n").trim().to_string()
}
