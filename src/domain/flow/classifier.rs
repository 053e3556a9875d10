//! Utterance classification.
//!
//! Tags an educator's utterance before validation and strategy selection:
//! help request, what-if selection, suggestion selection, confirmation,
//! or a request to refine the open offer.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::design::ConversationTurn;

/// Utterances this short (in characters) read as a request for help.
const SHORT_HELP_MAX_CHARS: usize = 5;

/// Weak help words only count in utterances up to this many words.
const WEAK_HELP_MAX_WORDS: usize = 6;

/// Confirmation phrases may be followed by a few filler words.
const CONFIRMATION_MAX_WORDS: usize = 6;

/// Substring suggestion matches need at least this many characters.
const MIN_PARTIAL_MATCH_CHARS: usize = 6;

static STRONG_HELP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(not sure|unsure|can you help|could you help|help me|give me some|i don'?t know|no idea|i'?m stuck|any ideas|some ideas|some examples|suggest something)\b",
    )
    .expect("valid regex")
});

/// Requests for examples or ideas, whatever their length.
static REQUEST_HELP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\b(show|give|share|offer|send) me (some |a few |more |an? |any )?(good )?(examples?|ideas|suggestions|options)\b|^\s*(please\s+)?(can|could|would) you (please\s+)?(show|give|share|suggest|offer|list)\b|^\s*(any|what are some|some) (good )?(examples?|ideas|suggestions)\b|\bexamples? (of|for)\b.*\?\s*$)",
    )
    .expect("valid regex")
});

static WEAK_HELP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(help|examples?|ideas|suggestions?)\b").expect("valid regex"));

static REFINEMENT_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(make it (more|less|shorter|simpler|clearer)|connect it|focus it|refine( it)?|tweak it|can we refine)\b")
        .expect("valid regex")
});

// Apostrophes are dropped before matching, so "let's go" reads "lets go".
const CONFIRMATIONS: &[&str] = &[
    "yes",
    "yes please",
    "yep",
    "yeah",
    "ok",
    "okay",
    "sure",
    "sure thing",
    "sounds good",
    "looks good",
    "that works",
    "perfect",
    "great",
    "i like it",
    "i love it",
    "keep it",
    "keep and continue",
    "continue",
    "move forward",
    "lets move forward",
    "lets move on",
    "go ahead",
    "lets go",
    "next",
];

/// Confirmations that may open a longer reply, such as "yes, let's move on".
const LEADING_CONFIRMATIONS: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "okay",
    "ok",
    "sure",
    "sounds good",
    "looks good",
    "that works",
    "i like it",
    "i love it",
    "keep it",
    "go ahead",
    "lets go",
    "lets move forward",
    "lets move on",
];

/// Words that may follow a leading confirmation without punctuation.
const CONFIRMATION_TAILS: &[&str] = &[
    "please",
    "thanks",
    "thank you",
    "great",
    "perfect",
    "continue",
    "lets continue",
    "keep going",
    "move on",
    "move forward",
    "lets move on",
    "lets move forward",
    "lets go",
    "go ahead",
    "keep it",
    "that works",
    "sounds good",
    "looks good",
    "i like it",
    "i love it",
];

/// Classification of one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_help_request: bool,
    pub is_what_if_selection: bool,
    pub is_suggestion_selection: bool,
    pub is_confirmation: bool,
    pub is_refinement_request: bool,
    /// True when the utterance should not be validated as content.
    pub skip_validation: bool,
    /// The value this utterance proposes for the current step.
    pub proposed_value: Option<String>,
    /// The suggestion the utterance matched, verbatim.
    pub matched_suggestion: Option<String>,
}

/// Classifies `utterance` against the suggestions that were on screen.
///
/// Suggestions come from `prior_suggestions` and from the prior assistant
/// turn. Pure; never fails.
pub fn classify(
    utterance: &str,
    prior_assistant_turn: Option<&ConversationTurn>,
    prior_suggestions: &[String],
) -> Classification {
    let trimmed = utterance.trim();
    let normalized = normalize(trimmed);
    let word_count = trimmed.split_whitespace().count();

    let is_confirmation = is_confirmation(trimmed);
    let is_what_if = normalized.starts_with("what if");
    let is_refinement = !is_confirmation && REFINEMENT_REQUEST.is_match(trimmed);

    let is_help = !is_confirmation
        && !is_what_if
        && !is_refinement
        && (trimmed.chars().count() <= SHORT_HELP_MAX_CHARS
            || STRONG_HELP.is_match(trimmed)
            || REQUEST_HELP.is_match(trimmed)
            || (word_count <= WEAK_HELP_MAX_WORDS && WEAK_HELP.is_match(trimmed)));

    let matched_suggestion = if is_confirmation || is_refinement || is_help {
        None
    } else {
        prior_suggestions
            .iter()
            .chain(prior_assistant_turn.into_iter().flat_map(|t| t.suggestions.iter()))
            .filter(|suggestion| !is_refinement_style(suggestion))
            .find(|suggestion| suggestion_matches(&normalized, suggestion))
            .cloned()
    };

    // A clicked what-if chip is a what-if selection; a typed "what if" is too.
    let is_what_if_selection = is_what_if
        || matched_suggestion
            .as_deref()
            .is_some_and(|s| normalize(s).starts_with("what if"));
    let is_suggestion_selection = matched_suggestion.is_some() && !is_what_if_selection;

    let proposed_value = if is_help || is_what_if_selection || is_refinement || is_confirmation {
        None
    } else if let Some(suggestion) = &matched_suggestion {
        Some(suggestion.trim().to_string())
    } else if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    };

    Classification {
        is_help_request: is_help,
        is_what_if_selection,
        is_suggestion_selection,
        is_confirmation,
        is_refinement_request: is_refinement,
        skip_validation: is_help || is_what_if_selection || is_refinement,
        proposed_value,
        matched_suggestion,
    }
}

/// Lowercases, trims, and drops trailing punctuation and quotes.
fn normalize(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase()
}

/// Exact confirmations, or a leading confirmation followed by punctuation
/// ("yes, let's move forward") or by a known tail ("ok thanks").
fn is_confirmation(utterance: &str) -> bool {
    let lowered = utterance.trim().to_lowercase().replace(['\'', '’'], "");

    if CONFIRMATIONS.contains(&collapse(&lowered).as_str()) {
        return true;
    }
    if lowered.split_whitespace().count() > CONFIRMATION_MAX_WORDS {
        return false;
    }

    LEADING_CONFIRMATIONS.iter().any(|phrase| {
        let Some(rest) = lowered.strip_prefix(phrase) else {
            return false;
        };
        match rest.chars().next() {
            None => true,
            Some(c) if c.is_ascii_punctuation() => true,
            Some(c) if c.is_whitespace() => CONFIRMATION_TAILS.contains(&collapse(rest).as_str()),
            Some(_) => false,
        }
    })
}

/// Keeps letters, digits and single spaces.
fn collapse(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Refinement-style chips steer the open offer; they are never content.
fn is_refinement_style(suggestion: &str) -> bool {
    let lowered = normalize(suggestion);
    ["make it more", "connect it more", "focus it on"]
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
        || lowered.contains("refine")
        || lowered.contains("keep and continue")
}

fn suggestion_matches(normalized_utterance: &str, suggestion: &str) -> bool {
    let suggestion = normalize(suggestion);
    if suggestion.is_empty() || normalized_utterance.is_empty() {
        return false;
    }
    if suggestion == normalized_utterance {
        return true;
    }

    let (shorter, longer) = if suggestion.len() <= normalized_utterance.len() {
        (suggestion.as_str(), normalized_utterance)
    } else {
        (normalized_utterance, suggestion.as_str())
    };
    shorter.chars().count() >= MIN_PARTIAL_MATCH_CHARS && longer.contains(shorter)
}
