//! Artist resolution from question text and candidate titles.
//!
//! Candidate artists come from two title conventions: the segment before a
//! `" - "` separator, and featuring-style clauses (`feat.`, `ft.`,
//! `featuring`, `with`). Candidates are scored against the question tokens;
//! an artist whose name appears verbatim in the question wins immediately.
//! Candidates are kept in first-encountered order so that the verbatim
//! short-circuit resolves ties reproducibly.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Filler words that never identify an artist.
const STOP_WORDS: &[&str] = &[
    "songs", "song", "music", "by", "from", "what", "which", "show", "me", "did", "i", "listen",
    "to", "today", "yesterday", "last", "week", "the", "a", "an", "my", "all", "any", "that",
    "in", "on",
];

/// Leading browser-tab counter, e.g. `(3) `.
static TAB_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d+\)\s*").expect("prefix pattern"));

/// Featuring-clause patterns, matched against the lower-cased title.
static FEAT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\(feat\.?\s+([^)]+)\)",
        r"\(ft\.?\s+([^)]+)\)",
        r"feat\.?\s+([^,\)]+)",
        r"ft\.?\s+([^,\)]+)",
        r"featuring\s+([^,\)]+)",
        r"with\s+([^,\)]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("featuring pattern"))
    .collect()
});

pub(crate) fn strip_tab_prefix(s: &str) -> String {
    TAB_PREFIX.replace(s, "").into_owned()
}

/// Resolves the best-matching artist for the question from the candidate
/// titles, or `None` when nothing scores at least 1.
pub fn resolve_artist(question: &str, titles: &[&str]) -> Option<String> {
    let q_lower = question.to_lowercase();

    let tokens: Vec<&str> = q_lower
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w) && w.len() > 2)
        .collect();
    if tokens.is_empty() {
        return None;
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |candidates: &mut Vec<String>, value: String| {
        if !value.is_empty() && seen.insert(value.clone()) {
            candidates.push(value);
        }
    };

    for title in titles {
        if let Some((main, _)) = title.split_once(" - ") {
            push(&mut candidates, strip_tab_prefix(main.trim()));
        }

        let title_lower = title.to_lowercase();
        for pattern in FEAT_PATTERNS.iter() {
            for caps in pattern.captures_iter(&title_lower) {
                push(&mut candidates, strip_tab_prefix(caps[1].trim()));
            }
        }
    }

    let mut best: Option<String> = None;
    let mut best_score = 0;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        if q_lower.contains(&candidate_lower) {
            return Some(candidate);
        }

        let mut score = 0;
        for qt in &tokens {
            for at in candidate_lower.split_whitespace() {
                if *qt == at {
                    score += 2;
                } else if qt.contains(at) || at.contains(*qt) {
                    score += 1;
                }
            }
        }

        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    if best_score >= 1 {
        best
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_artist_short_circuits() {
        let titles = ["Artist A - Song One", "Artist B feat. Artist A - Song Two"];
        assert_eq!(
            resolve_artist("songs by artist a", &titles).as_deref(),
            Some("Artist A")
        );
    }

    #[test]
    fn token_scoring_picks_the_best_candidate() {
        let titles = ["The Weeknd - Blinding Lights", "Dua Lipa - Houdini"];
        assert_eq!(
            resolve_artist("play weeknd please", &titles).as_deref(),
            Some("The Weeknd")
        );
    }

    #[test]
    fn featuring_clauses_yield_lowercased_candidates() {
        let titles = ["Big Act - Hit Single (feat. Carly Rae)"];
        // Featuring captures are scanned on the lower-cased title.
        assert_eq!(
            resolve_artist("anything by carly?", &titles).as_deref(),
            Some("carly rae")
        );
    }

    #[test]
    fn tab_counter_prefix_is_stripped() {
        let titles = ["(2) Dua Lipa - Houdini"];
        assert_eq!(resolve_artist("play dua lipa", &titles).as_deref(), Some("Dua Lipa"));
    }

    #[test]
    fn stop_words_alone_resolve_nothing() {
        let titles = ["Artist A - Song One"];
        assert_eq!(resolve_artist("what did i listen to", &titles), None);
    }

    #[test]
    fn below_threshold_scores_resolve_nothing() {
        let titles = ["Artist A - Song One"];
        assert_eq!(resolve_artist("show cooking videos", &titles), None);
    }

    #[test]
    fn candidate_order_is_first_encountered() {
        // Both candidate names appear verbatim in the question; the one from
        // the earlier title wins because candidates keep encounter order.
        let titles = ["Beta - One", "Alpha - Two"];
        assert_eq!(
            resolve_artist("songs beta alpha mix", &titles).as_deref(),
            Some("Beta")
        );
    }
}
