//! Line-boundary splitter for canonical record text.
//!
//! Record text is line-oriented (one `Label: value` per line), so splitting
//! happens on line boundaries up to a character budget. A single line longer
//! than the budget is hard-split at the nearest space. Every record yields
//! at least one span.

/// Split text into spans on line boundaries, respecting `max_chars`.
///
/// Spans come back in document order; the index of a span in the returned
/// vector is its chunk index.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut spans = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current.is_empty() {
            trimmed.len()
        } else {
            current.len() + 1 + trimmed.len() // +1 for the newline
        };

        if would_be > max_chars && !current.is_empty() {
            spans.push(current.clone());
            current.clear();
        }

        if trimmed.len() > max_chars {
            if !current.is_empty() {
                spans.push(current.clone());
                current.clear();
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = floor_char_boundary(remaining, remaining.len().min(max_chars));
                let actual = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind(' ')
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                spans.push(remaining[..actual].trim().to_string());
                remaining = &remaining[actual..];
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(trimmed);
        }
    }

    if !current.is_empty() {
        spans.push(current);
    }

    if spans.is_empty() {
        spans.push(text.trim().to_string());
    }

    spans
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
