//! Visit-time bucketing and URL categorization.
//!
//! Both functions are pure and deterministic. The category cascade is an
//! ordered list of (substring set, category) rules: a URL can match several
//! substrings (a Google-hosted AWS console link, say), so the first match
//! wins and the order below is a fixed contract.

/// Ordered category cascade, highest priority first.
const CATEGORY_RULES: &[(&[&str], &str)] = &[
    (&["leetcode.com"], "Programming Practice"),
    (&["github.com"], "Code Repository"),
    (&["chatgpt.com", "claude.ai", "perplexity.ai"], "AI Assistant"),
    (&["docs.google.com"], "Documentation"),
    (&["aws"], "Cloud Services"),
    (&["x.com", "twitter.com"], "Social Media"),
    (&["cricbuzz.com"], "Sports News"),
    (&["youtube.com", "music.youtube.com"], "Media"),
    (&["spotify.com"], "Music Streaming"),
];

/// Maps an hour of day to one of four named day-periods.
///
/// Morning = [5, 12), Afternoon = [12, 17), Evening = [17, 22), Night
/// otherwise. The four buckets partition [0, 24) with no gaps.
pub fn time_period(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Morning",
        12..=16 => "Afternoon",
        17..=21 => "Evening",
        _ => "Night",
    }
}

/// Maps a URL/title pair to a content category.
///
/// Evaluates [`CATEGORY_RULES`] in order against the lower-cased URL and
/// returns the first match, falling back to `General`.
pub fn content_category(url: &str, _title: &str) -> &'static str {
    let u = url.to_lowercase();
    for (needles, category) in CATEGORY_RULES {
        if needles.iter().any(|n| u.contains(n)) {
            return category;
        }
    }
    "General"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_period_partitions_the_day() {
        for hour in 0..24 {
            let p = time_period(hour);
            let expected = if (5..12).contains(&hour) {
                "Morning"
            } else if (12..17).contains(&hour) {
                "Afternoon"
            } else if (17..22).contains(&hour) {
                "Evening"
            } else {
                "Night"
            };
            assert_eq!(p, expected, "hour {}", hour);
        }
    }

    #[test]
    fn time_period_boundaries_start_their_bucket() {
        assert_eq!(time_period(5), "Morning");
        assert_eq!(time_period(12), "Afternoon");
        assert_eq!(time_period(17), "Evening");
        assert_eq!(time_period(22), "Night");
    }

    #[test]
    fn category_first_match_wins() {
        // Contains both github.com and aws; the cascade puts Code Repository first.
        assert_eq!(
            content_category("https://github.com/aws/aws-cli", ""),
            "Code Repository"
        );
        assert_eq!(
            content_category("https://console.aws.amazon.com/ec2", ""),
            "Cloud Services"
        );
    }

    #[test]
    fn category_is_case_insensitive_on_the_url() {
        assert_eq!(content_category("https://GitHub.com/rust", ""), "Code Repository");
    }

    #[test]
    fn category_falls_back_to_general() {
        assert_eq!(content_category("https://example.org/page", "Anything"), "General");
    }

    #[test]
    fn category_examples() {
        assert_eq!(content_category("https://leetcode.com/problems/two-sum", ""), "Programming Practice");
        assert_eq!(content_category("https://claude.ai/chat", ""), "AI Assistant");
        assert_eq!(content_category("https://docs.google.com/document/d/1", ""), "Documentation");
        assert_eq!(content_category("https://x.com/home", ""), "Social Media");
        assert_eq!(content_category("https://www.cricbuzz.com/live-scores", ""), "Sports News");
        assert_eq!(content_category("https://music.youtube.com/watch?v=a", ""), "Media");
        assert_eq!(content_category("https://open.spotify.com/track/b", ""), "Music Streaming");
    }
}
