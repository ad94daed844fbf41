//! Query interpretation: free text in, structured filters + expanded query out.
//!
//! Every extraction here is an ordered cascade of string rules — first match
//! wins, and a miss is never an error, just an absent filter. The expanded
//! query text is only used to steer embedding search; filtering decisions
//! come exclusively from the structured fields.

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Structured interpretation of one question.
#[derive(Debug, Clone)]
pub struct QueryIntent {
    /// `YYYY-MM-DD` (day granularity) or `YYYY-MM` (month granularity).
    pub date: Option<String>,
    pub domain: Option<String>,
    pub music: bool,
    pub exclude_music: bool,
    pub exclude_youtube: bool,
    /// Question text plus date rendering and intent hint tokens, for embedding.
    pub expanded: String,
}

/// Month-name rules in evaluation order. Short forms precede long forms so
/// that e.g. `jan 2024` resolves before the `january` rule is consulted, and
/// bare short forms (length 3) never trigger month granularity on their own.
const MONTH_NAMES: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

struct MonthRule {
    name: &'static str,
    num: u32,
    /// `<name> <4-digit year>` → month granularity.
    year: Regex,
    /// `<name> <1-2 digit day>` → day granularity.
    day_after: Regex,
    /// `<1-2 digit day> <name>` → day granularity.
    day_before: Regex,
}

static MONTH_RULES: Lazy<Vec<MonthRule>> = Lazy::new(|| {
    MONTH_NAMES
        .iter()
        .map(|&(name, num)| MonthRule {
            name,
            num,
            year: Regex::new(&format!(r"{}\s+(\d{{4}})", name)).expect("month-year pattern"),
            day_after: Regex::new(&format!(r"{}\s*(\d{{1,2}})", name)).expect("month-day pattern"),
            day_before: Regex::new(&format!(r"(\d{{1,2}})\s*{}", name)).expect("day-month pattern"),
        })
        .collect()
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("iso date pattern"));
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("slash date pattern"));

/// Keyword → domain rules in evaluation order.
const DOMAIN_RULES: &[(&str, &str)] = &[
    ("youtube", "youtube.com"),
    ("spotify", "spotify.com"),
    ("github", "github.com"),
    ("leetcode", "leetcode.com"),
    ("google docs", "docs.google.com"),
    ("gmail", "mail.google.com"),
    ("x.com", "x.com"),
    ("twitter", "x.com"),
];

/// Negation phrases that suppress the music intent entirely.
const MUSIC_EXCLUSION_PHRASES: &[&str] = &[
    "apart from song",
    "except song",
    "besides song",
    "other than song",
    "excluding song",
    "not song",
    "no song",
];

const MUSIC_WORDS: &[&str] = &["song", "music", "sing", "artist", "track"];

const FEMALE_WORDS: &[&str] = &["girl", "woman", "female", "she"];
const MALE_WORDS: &[&str] = &["boy", "man", "male", "he"];

/// Extracts at most one date from the question.
///
/// Cascade, first match wins: relative day words, month-name forms, numeric
/// `YYYY-MM-DD`, numeric `MM/DD/YYYY`. Day-granularity results are not
/// calendar-validated (`feb 31` yields `YYYY-02-31` and simply matches no
/// visit date). "last week" collapses to a single anchor day, today − 7.
pub fn extract_date(question: &str, today: NaiveDate) -> Option<String> {
    let q = question.to_lowercase();
    let current_year = today.year();

    if q.contains("yesterday") {
        return Some((today - Duration::days(1)).format("%Y-%m-%d").to_string());
    }
    if q.contains("today") {
        return Some(today.format("%Y-%m-%d").to_string());
    }
    if q.contains("last week") {
        return Some((today - Duration::days(7)).format("%Y-%m-%d").to_string());
    }
    if q.contains("this week") {
        return Some(today.format("%Y-%m-%d").to_string());
    }

    for rule in MONTH_RULES.iter() {
        if let Some(m) = rule.year.captures(&q) {
            let year: i32 = m[1].parse().ok()?;
            return Some(format!("{}-{:02}", year, rule.num));
        }
        if let Some(m) = rule.day_after.captures(&q) {
            let day: u32 = m[1].parse().ok()?;
            return Some(format!("{}-{:02}-{:02}", current_year, rule.num, day));
        }
        if let Some(m) = rule.day_before.captures(&q) {
            let day: u32 = m[1].parse().ok()?;
            return Some(format!("{}-{:02}-{:02}", current_year, rule.num, day));
        }
        if rule.name.len() > 3 && q.contains(rule.name) {
            return Some(format!("{}-{:02}", current_year, rule.num));
        }
    }

    if let Some(m) = ISO_DATE.captures(&q) {
        let (y, mo, d) = (&m[1], &m[2], &m[3]);
        return Some(format!("{}-{:0>2}-{:0>2}", y, mo, d));
    }
    if let Some(m) = SLASH_DATE.captures(&q) {
        let (mo, d, y) = (&m[1], &m[2], &m[3]);
        return Some(format!("{}-{:0>2}-{:0>2}", y, mo, d));
    }

    None
}

/// Maps the question to a known domain, first rule wins.
pub fn extract_domain(question: &str) -> Option<String> {
    let q = question.to_lowercase();
    DOMAIN_RULES
        .iter()
        .find(|(keyword, _)| q.contains(keyword))
        .map(|(_, domain)| domain.to_string())
}

/// Renders an extracted date back to human-readable text for the expanded
/// query. Best effort: an unparseable date contributes nothing.
fn render_date_hint(date: &str) -> Option<String> {
    if date.len() == 7 {
        let first = NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d").ok()?;
        Some(first.format("%B %Y").to_string())
    } else {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        Some(day.format("%A %B %d %Y").to_string())
    }
}

/// Interprets a question into structured filters plus the expanded query
/// text sent for embedding.
///
/// Exclusion phrases are checked before the music trigger words, so
/// exclude-music and music intent are mutually exclusive by construction.
pub fn interpret(question: &str, today: NaiveDate) -> QueryIntent {
    let q = question.to_lowercase();

    let date = extract_date(question, today);
    let domain = extract_domain(question);

    let exclude_music = MUSIC_EXCLUSION_PHRASES.iter().any(|p| q.contains(p));
    let exclude_youtube = q.contains("apart from youtube") || q.contains("except youtube");
    let music = !exclude_music && MUSIC_WORDS.iter().any(|w| q.contains(w));

    let mut expanded = question.to_string();

    if let Some(date) = &date {
        if let Some(hint) = render_date_hint(date) {
            expanded.push(' ');
            expanded.push_str(&hint);
        }
    }

    if music {
        expanded.push_str(" music audio video song");
        if q.contains("piano") {
            expanded.push_str(" piano acoustic instrumental");
        }
        if q.contains("guitar") {
            expanded.push_str(" guitar acoustic");
        }
        if q.contains("rain") {
            expanded.push_str(" rain");
        }
        if q.contains("danc") {
            expanded.push_str(" dancing dance");
        }
        if FEMALE_WORDS.iter().any(|w| q.contains(w)) {
            expanded.push_str(" female woman girl");
        }
        if MALE_WORDS.iter().any(|w| q.contains(w)) {
            expanded.push_str(" male man boy");
        }
        if q.contains("duet") || q.contains("together") {
            expanded.push_str(" duet collaboration featuring");
        }
    } else if exclude_music {
        expanded.push_str(" browsing web article page website");
    }

    QueryIntent {
        date,
        domain,
        music,
        exclude_music,
        exclude_youtube,
        expanded,
    }
}
