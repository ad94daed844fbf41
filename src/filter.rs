//! Post-retrieval filtering of similarity-ranked candidates.
//!
//! The raw candidate list is oversampled relative to `top_k`; this module
//! applies the structured filters in a fixed order — date/domain, artist
//! resolution, exclusions — then truncates. Unfiltered candidates keep
//! their relative order throughout, so the surviving positions become the
//! citation numbers. The whole pass is deterministic: running it twice on
//! the same inputs yields identical output.

use crate::artist::resolve_artist;
use crate::models::Candidate;
use crate::query::QueryIntent;

/// Title phrases that mark a music item for the exclude-music pass.
const MUSIC_TITLE_MARKERS: &[&str] = &[
    "official audio",
    "official video",
    "music video",
    "lyric",
    "lyrics",
    "(audio)",
    "(official)",
    "ft.",
    "feat.",
];

const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "music.youtube.com"];

/// Looser music markers applied only to YouTube-hosted titles.
const YOUTUBE_MUSIC_TOKENS: &[&str] = &[" - ", "official", "audio", "music", "ft", "feat"];

/// Outcome of the filter pass.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Results {
        candidates: Vec<Candidate>,
        /// Artist resolved from the post-date/domain pool, music intent only.
        artist: Option<String>,
    },
    /// Nothing survived; `answer` is rendered to the user as-is.
    Empty { answer: String },
}

/// Applies the structured filters to the raw candidate list.
pub fn apply(
    intent: &QueryIntent,
    question: &str,
    raw: Vec<Candidate>,
    top_k: usize,
) -> FilterOutcome {
    let mut candidates = raw;

    if intent.date.is_some() || intent.domain.is_some() {
        candidates.retain(|c| {
            if let Some(date) = &intent.date {
                // Month granularity (YYYY-MM) prefix-matches; day granularity
                // must match exactly.
                let matched = if date.len() == 7 {
                    c.meta.visit_date.starts_with(date.as_str())
                } else {
                    c.meta.visit_date == *date
                };
                if !matched {
                    return false;
                }
            }
            if let Some(domain) = &intent.domain {
                if c.meta.domain != *domain {
                    return false;
                }
            }
            true
        });
    }

    // Artist resolution runs over the date/domain-filtered pool, not the raw one.
    let artist = if intent.music {
        let titles: Vec<&str> = candidates.iter().map(|c| c.meta.title.as_str()).collect();
        resolve_artist(question, &titles)
    } else {
        None
    };

    candidates.retain(|c| !excluded(c, intent, artist.as_deref()));
    candidates.truncate(top_k);

    if candidates.is_empty() {
        let answer = if let Some(artist) = &artist {
            format!("No songs featuring {} found.", artist)
        } else if let (Some(date), Some(domain)) = (&intent.date, &intent.domain) {
            format!("No {} activity found from {}.", domain, date)
        } else {
            "No matching results found.".to_string()
        };
        return FilterOutcome::Empty { answer };
    }

    FilterOutcome::Results { candidates, artist }
}

fn excluded(c: &Candidate, intent: &QueryIntent, artist: Option<&str>) -> bool {
    let title_lower = c.meta.title.to_lowercase();
    let domain = c.meta.domain.to_lowercase();
    let category = c.meta.content_category.to_lowercase();

    if intent.music {
        if let Some(artist) = artist {
            if !title_lower.contains(&artist.to_lowercase()) {
                return true;
            }
        }
    }

    if intent.exclude_music {
        if MUSIC_TITLE_MARKERS.iter().any(|m| title_lower.contains(m)) {
            return true;
        } else if YOUTUBE_DOMAINS.contains(&domain.as_str()) {
            // A YouTube title with no music-like token stays in even though
            // its category is Media; only the looser token check applies here.
            if YOUTUBE_MUSIC_TOKENS.iter().any(|t| title_lower.contains(t)) {
                return true;
            }
        } else if category == "media" || category == "music streaming" {
            return true;
        }
    }

    if intent.exclude_youtube && domain.contains("youtube.com") {
        return true;
    }

    false
}
