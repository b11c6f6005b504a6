//! Paralinguistic marker hygiene
//!
//! The synthesis model renders a small set of bracketed markers as
//! non-verbal sounds. Classifier output is filtered so that only known
//! markers survive, only at sentence boundaries, never back to back, and
//! at most [`MAX_MARKERS`] per response. Verbatim (DIRECT) content keeps
//! only markers the user typed themselves.

use domain::{Intent, PARALINGUISTIC_TAGS};

/// Upper bound on markers in one response
pub const MAX_MARKERS: usize = 2;

const SENTENCE_END: [char; 4] = ['.', '!', '?', '…'];

/// Filter markers in `content` according to the placement rules
pub fn sanitize(content: &str, intent: Intent, original_input: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut kept = 0usize;
    // Byte length of `out` (trimmed) right after the last kept marker
    let mut last_marker_end: Option<usize> = None;
    let mut rest = content;

    while let Some(open) = rest.find('[') {
        let Some(close_rel) = rest[open..].find(']') else {
            break;
        };
        let close = open + close_rel;
        let candidate = &rest[open..=close];
        out.push_str(&rest[..open]);
        let after = &rest[close + 1..];

        if let Some(tag) = known_tag(candidate) {
            let allowed_by_intent = match intent {
                Intent::Reply => true,
                Intent::Direct => contains_tag(original_input, tag),
            };
            let before = out.trim_end();
            let stacked = last_marker_end == Some(before.len());
            let at_boundary = is_sentence_start(before) || is_sentence_end(after);

            if allowed_by_intent && !stacked && at_boundary && kept < MAX_MARKERS {
                out.push_str(tag);
                kept += 1;
                last_marker_end = Some(out.trim_end().len());
            }
        } else if !looks_like_marker(candidate) {
            // Ordinary bracketed text, not a marker
            out.push_str(candidate);
        }

        rest = after;
    }
    out.push_str(rest);

    normalize_spacing(&out)
}

/// Number of known markers in `text`
pub fn count_markers(text: &str) -> usize {
    PARALINGUISTIC_TAGS
        .iter()
        .map(|tag| text.to_lowercase().matches(tag).count())
        .sum()
}

fn known_tag(candidate: &str) -> Option<&'static str> {
    let lowered = candidate.to_lowercase();
    PARALINGUISTIC_TAGS
        .iter()
        .copied()
        .find(|tag| *tag == lowered)
}

fn contains_tag(text: &str, tag: &str) -> bool {
    text.to_lowercase().contains(tag)
}

/// Short lowercase bracketed words are treated as (unknown) markers
fn looks_like_marker(candidate: &str) -> bool {
    let inner = &candidate[1..candidate.len() - 1];
    !inner.is_empty()
        && inner.len() <= 24
        && inner.chars().all(|c| c.is_ascii_lowercase() || c == ' ')
}

fn is_sentence_start(before: &str) -> bool {
    before.is_empty() || before.ends_with(SENTENCE_END)
}

fn is_sentence_end(after: &str) -> bool {
    let after = after.trim_start();
    after.is_empty() || after.starts_with(SENTENCE_END)
}

fn normalize_spacing(text: &str) -> String {
    let mut joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for punct in [" .", " ,", " !", " ?"] {
        while joined.contains(punct) {
            joined = joined.replace(punct, &punct[1..]);
        }
    }
    joined
}
