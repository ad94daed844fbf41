//! Answer rendering: filtered candidates to cited, human-readable text.
//!
//! The answer is an append-only sequence of rendered lines joined by
//! newlines at the end. Citations `[#N]` use the candidate's 1-based rank
//! in the post-filter list, assigned before any per-section display cap.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::artist::strip_tab_prefix;
use crate::models::{nonempty, Candidate, SourceRef};
use crate::query::QueryIntent;

/// Bracketed or parenthesized annotations in a song title, e.g.
/// `(Official Video)` or `[4K Remaster]`.
static TITLE_ANNOTATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\(\[].*?[\)\]]").expect("annotation pattern"));

/// Separators that indicate more than one credited artist.
static ARTIST_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",|&| feat\.?| ft\.?").expect("separator pattern"));

/// Question phrases that ask for three-or-more-artist collaborations.
const THREE_ARTIST_PHRASES: &[&str] = &["3 people", "three people", "three artist", "3 artist"];

/// Question words that describe a song rather than naming it.
const DESCRIPTION_WORDS: &[&str] = &["piano", "guitar", "rain", "danc", "beach", "night"];

/// One deduplicated song parsed out of a candidate title.
#[derive(Debug, Clone)]
pub struct SongEntry {
    pub artist: String,
    pub song: String,
    pub title: String,
    /// 1-based rank of the originating candidate in the post-filter list.
    pub citation: usize,
    pub artist_count: usize,
    pub context: String,
}

/// Parses and deduplicates song entries from the filtered candidates.
///
/// Dedup key is the tab-prefix-stripped, lower-cased, trimmed title; the
/// first occurrence keeps its citation number.
pub fn collect_songs(candidates: &[Candidate]) -> Vec<SongEntry> {
    let mut seen: Vec<String> = Vec::new();
    let mut songs = Vec::new();

    for (i, c) in candidates.iter().enumerate() {
        let display = strip_tab_prefix(&c.meta.title);
        let clean = display.to_lowercase().trim().to_string();
        if display.is_empty() || seen.contains(&clean) {
            continue;
        }
        seen.push(clean);

        let mut artist = "Unknown".to_string();
        let mut song = display.clone();
        if let Some((before, after)) = display.split_once(" - ") {
            artist = before.trim().to_string();
            song = TITLE_ANNOTATIONS
                .replace_all(after.trim(), "")
                .trim()
                .to_string();
        }

        let artist_lower = artist.to_lowercase();
        let artist_count = if artist.contains(", ")
            || artist.contains(" & ")
            || artist_lower.contains(" feat")
            || artist_lower.contains(" ft.")
        {
            ARTIST_SEPARATORS.split(&artist).count()
        } else {
            1
        };

        let mut context_parts: Vec<&str> = Vec::new();
        if let Some(extracted) = &c.meta.extracted {
            if let Some(v) = nonempty(&extracted.contextual_keywords) {
                context_parts.push(v);
            }
            if let Some(v) = nonempty(&extracted.video_type) {
                context_parts.push(v);
            }
        }

        songs.push(SongEntry {
            artist,
            song,
            title: display,
            citation: i + 1,
            artist_count,
            context: context_parts.join(", "),
        });
    }

    songs
}

/// Renders the final answer for the surviving candidates.
pub fn compose_answer(
    question: &str,
    intent: &QueryIntent,
    artist: Option<&str>,
    candidates: &[Candidate],
) -> String {
    let q_lower = question.to_lowercase();
    let mut lines: Vec<String> = Vec::new();

    if intent.music {
        let songs = collect_songs(candidates);

        if let Some(artist) = artist {
            lines.push(format!("Songs featuring {}:\n", artist));
            for song in songs.iter().take(20) {
                lines.push(song_line(song, true));
            }
        } else if THREE_ARTIST_PHRASES.iter().any(|p| q_lower.contains(p)) {
            let multi: Vec<&SongEntry> = songs.iter().filter(|s| s.artist_count >= 3).collect();
            if !multi.is_empty() {
                lines.push("Songs with 3 or more artists:\n".to_string());
                for song in multi.iter().take(5) {
                    lines.push(song_line(song, true));
                }
            } else {
                lines.push("No songs with 3 artists found.\n".to_string());
                for song in songs.iter().take(10) {
                    lines.push(song_line(song, false));
                }
            }
        } else if DESCRIPTION_WORDS.iter().any(|w| q_lower.contains(w)) {
            let matching: Vec<&SongEntry> = songs
                .iter()
                .filter(|s| {
                    !s.context.is_empty()
                        && s.context
                            .to_lowercase()
                            .split(", ")
                            .any(|kw| q_lower.contains(kw))
                })
                .collect();
            if !matching.is_empty() {
                lines.push("Songs matching your description:\n".to_string());
                for song in matching.iter().take(10) {
                    lines.push(song_line(song, true));
                }
            } else {
                lines.push("Based on your description:\n".to_string());
                for song in songs.iter().take(10) {
                    lines.push(song_line(song, true));
                }
            }
        } else {
            lines.push("Here are the songs from your history:\n".to_string());
            for song in songs.iter().take(15) {
                lines.push(song_line(song, true));
            }
        }
    } else {
        if intent.exclude_music {
            lines.push("Here's your non-music browsing activity:\n".to_string());
        } else {
            lines.push("Here's what I found:\n".to_string());
        }

        let mut by_category: BTreeMap<String, Vec<(String, String, usize)>> = BTreeMap::new();
        for (i, c) in candidates.iter().enumerate() {
            by_category
                .entry(c.meta.content_category.clone())
                .or_default()
                .push((c.meta.title.clone(), c.meta.domain.clone(), i + 1));
        }

        let multiple = by_category.len() > 1;
        for (category, items) in &by_category {
            if multiple {
                lines.push(format!("\n**{}:**", category));
            }
            for (title, domain, citation) in items.iter().take(5) {
                lines.push(format!("• {} ({}) [#{}]", title, domain, citation));
            }
        }
    }

    lines.join("\n")
}

fn song_line(song: &SongEntry, with_context: bool) -> String {
    let context = if with_context && !song.context.is_empty() {
        format!(" ({})", song.context)
    } else {
        String::new()
    };
    format!("• {} - {}{} [#{}]", song.artist, song.song, context, song.citation)
}

/// Builds the citation list for the response payload.
pub fn sources(candidates: &[Candidate]) -> Vec<SourceRef> {
    candidates
        .iter()
        .map(|c| SourceRef {
            url: c.meta.url.clone(),
            title: c.meta.title.clone(),
            meta: format!(
                "{} {} {}",
                c.meta.visit_date, c.meta.day_name, c.meta.time_period
            )
            .trim()
            .to_string(),
        })
        .collect()
}
