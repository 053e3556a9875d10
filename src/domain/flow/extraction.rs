//! Concept extraction from what-if prompts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extracted concepts longer than this are treated as unusable.
const MAX_CONCEPT_WORDS: usize = 8;

static ANCHORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:called it|named it|call it|name it|focused on|centered on|centred on|was about|were about|explored|created|produced|made|built|designed|used|investigated)\s+(.+)$",
    )
    .expect("valid regex")
});

static LEADING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(a|an|the|some)\s+").expect("valid regex"));

static LEADING_SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(you|we|students|they|it|the project|learners)\s+").expect("valid regex")
});

/// Pulls the concept out of a what-if prompt such as
/// "What if you called it a Community Water Audit?".
///
/// Returns `None` when nothing usable can be found.
pub fn extract_what_if_concept(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    let rest = if lowered.starts_with("what if") {
        trimmed.get("what if".len()..)?.trim()
    } else {
        trimmed
    };

    let candidate = match ANCHORED.captures(rest).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => LEADING_SUBJECT
            .find(rest)
            .map(|m| &rest[m.end()..])
            .unwrap_or(rest),
    };

    let concept = candidate
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”');
    let concept = LEADING_ARTICLE.replace(concept, "");
    let concept = concept.trim();

    let words = concept.split_whitespace().count();
    if words == 0 || words > MAX_CONCEPT_WORDS {
        None
    } else {
        Some(concept.to_string())
    }
}
