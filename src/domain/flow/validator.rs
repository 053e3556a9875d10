//! Per-step content validation.
//!
//! Each step has a table of rules: a minimum word count, an optional
//! per-item word ceiling for list steps, ordered disallow rules, and an
//! allow vocabulary. Disallow rules take precedence over vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::domain::design::{split_items, StepId};

/// Why an utterance was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Empty,
    TooShort,
    ItemTooLong,
    ActivityNotDeliverable,
    TraditionalAssessment,
    ClosedQuestion,
    NotAQuestion,
    QuestionNotStatement,
    PassiveTask,
    MissingContent,
    MissingVocabulary,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionKind::Empty => "empty",
            RejectionKind::TooShort => "too_short",
            RejectionKind::ItemTooLong => "item_too_long",
            RejectionKind::ActivityNotDeliverable => "activity_not_deliverable",
            RejectionKind::TraditionalAssessment => "traditional_assessment",
            RejectionKind::ClosedQuestion => "closed_question",
            RejectionKind::NotAQuestion => "not_a_question",
            RejectionKind::QuestionNotStatement => "question_not_statement",
            RejectionKind::PassiveTask => "passive_task",
            RejectionKind::MissingContent => "missing_content",
            RejectionKind::MissingVocabulary => "missing_vocabulary",
        };
        f.write_str(s)
    }
}

/// Result of validating one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: Option<String>,
    pub kind: Option<RejectionKind>,
    /// Allow-vocabulary terms found in the utterance.
    pub vocabulary_hits: Vec<String>,
}

impl Verdict {
    fn accept(vocabulary_hits: Vec<String>) -> Self {
        Self {
            accepted: true,
            reason: None,
            kind: None,
            vocabulary_hits,
        }
    }

    fn reject(kind: RejectionKind, reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            kind: Some(kind),
            vocabulary_hits: Vec::new(),
        }
    }
}

/// Options that relax validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Skip the minimum word floor (suggestion selections).
    pub bypass_word_floor: bool,
}

/// When a rule fires.
enum Trigger {
    /// Fires when the pattern matches.
    Matches(Regex),
    /// Fires when the pattern does not match.
    Missing(Regex),
}

struct DisallowRule {
    trigger: Trigger,
    kind: RejectionKind,
    reason: &'static str,
}

impl DisallowRule {
    fn matches(pattern: &str, kind: RejectionKind, reason: &'static str) -> Self {
        Self {
            trigger: Trigger::Matches(compile(pattern)),
            kind,
            reason,
        }
    }

    fn missing(pattern: &str, kind: RejectionKind, reason: &'static str) -> Self {
        Self {
            trigger: Trigger::Missing(compile(pattern)),
            kind,
            reason,
        }
    }

    fn fires(&self, text: &str) -> bool {
        match &self.trigger {
            Trigger::Matches(re) => re.is_match(text),
            Trigger::Missing(re) => !re.is_match(text),
        }
    }
}

struct StepRules {
    min_words: usize,
    max_item_words: Option<usize>,
    disallow: Vec<DisallowRule>,
    vocabulary: &'static [&'static str],
    vocabulary_required: bool,
    vocabulary_reason: &'static str,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

const ACTIVITY_SUBJECT: &str = r"(?i)\b(students|they|learners|kids|we|the class|groups|teams)\s+(will\s+|would\s+|can\s+|should\s+|are going to\s+|need to\s+|are\s+)?(research|learn|study|explore|investigate|read|discuss|practice|work on|understand|analy[sz]e|brainstorm|watch|listen|look at|find out|researching|learning|studying|exploring|reading|discussing)\b";

const BARE_ACTIVITY: &str = r"(?i)^\s*(research|learn|study|explore|investigate|read|discuss|practice|analy[sz]e|brainstorm|understand|look at|find out)\s+(the|a|an|about|how|why|what|their|our|some|more)\b";

const TRADITIONAL_TESTING: &str = r"(?i)\b(tests?|quiz(zes)?|exams?|multiple[- ]choice|worksheets?|standardi[sz]ed|fill[- ]in[- ]the[- ]blanks?|true[- ]or[- ]false)\b";

const ACTIVITY_REASON: &str = "That describes an activity (what students will do), not a deliverable. Name the product students will create, such as a Research Report or a Policy Brief.";

const TESTING_REASON: &str = "Traditional tests don't capture what students learn in a project. Use authentic assessment, such as a rubric, a portfolio review, or a presentation to a real audience.";

static RULES: Lazy<HashMap<StepId, StepRules>> = Lazy::new(|| {
    let mut rules = HashMap::new();

    rules.insert(
        StepId::BigIdea,
        StepRules {
            min_words: 3,
            max_item_words: None,
            disallow: vec![
                DisallowRule::matches(
                    r"\?\s*$",
                    RejectionKind::QuestionNotStatement,
                    "A big idea is a statement of an enduring concept, not a question. We'll shape the question in the next step.",
                ),
                DisallowRule::matches(
                    ACTIVITY_SUBJECT,
                    RejectionKind::ActivityNotDeliverable,
                    "That describes what students will do. A big idea names the concept or theme the project explores.",
                ),
            ],
            vocabulary: &[
                "change", "identity", "justice", "community", "communities", "systems", "power",
                "sustainability", "relationship", "impact", "conflict", "innovation", "culture",
                "environment", "health", "equity", "resilience", "interdependence", "connect",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::EssentialQuestion,
        StepRules {
            min_words: 4,
            max_item_words: None,
            disallow: vec![
                DisallowRule::matches(
                    r"(?i)^\s*(is|are|does|do|did|was|were|can|will|has|have|had)\b",
                    RejectionKind::ClosedQuestion,
                    "That can be answered with a yes or no. An essential question stays open, for example one starting with \"How might we\" or \"Why does\".",
                ),
                DisallowRule::missing(
                    r"(?i)(\?\s*$|^\s*(how|why|what|in what ways|to what extent|should|who|which|when|where)\b)",
                    RejectionKind::NotAQuestion,
                    "Phrase the essential question as an open question students will wrestle with throughout the project.",
                ),
            ],
            vocabulary: &["how", "why", "might", "could", "should", "impact", "affect", "shape"],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Challenge,
        StepRules {
            min_words: 4,
            max_item_words: None,
            disallow: vec![DisallowRule::matches(
                TRADITIONAL_TESTING,
                RejectionKind::TraditionalAssessment,
                "A challenge is an authentic problem students tackle for a real audience, not a test.",
            )],
            vocabulary: &[
                "design", "create", "propose", "build", "develop", "solve", "advocate", "plan",
                "improve", "persuade", "audience", "community", "real", "redesign", "launch",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Phases,
        StepRules {
            min_words: 1,
            max_item_words: Some(8),
            disallow: vec![DisallowRule::matches(
                ACTIVITY_SUBJECT,
                RejectionKind::ActivityNotDeliverable,
                "List the phases as short named stages (for example Investigate, Design, Share), not sentences about what students do.",
            )],
            vocabulary: &[
                "launch", "investigate", "research", "design", "build", "prototype", "share",
                "present", "reflect", "explore", "create", "revise", "inquiry",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Activities,
        StepRules {
            min_words: 3,
            max_item_words: Some(20),
            disallow: vec![DisallowRule::matches(
                r"(?i)\b(worksheets?|lectures?|take notes|watch (a|the) video|read (the )?chapter|textbook questions)\b",
                RejectionKind::PassiveTask,
                "Those are passive tasks. Describe active inquiry students will do in this phase, such as interviews, fieldwork, or prototyping.",
            )],
            vocabulary: &[
                "interview", "survey", "research", "build", "prototype", "visit", "analyze",
                "design", "collaborate", "draft", "present", "experiment", "map", "model",
                "fieldwork", "test",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Resources,
        StepRules {
            min_words: 1,
            max_item_words: Some(15),
            disallow: vec![DisallowRule::matches(
                r"(?i)^\s*(none|nothing|n/?a|no)\s*$",
                RejectionKind::MissingContent,
                "Name at least one concrete resource: an expert, a place, a tool, or a text students can draw on.",
            )],
            vocabulary: &[
                "expert", "library", "museum", "partner", "guest", "tool", "kit", "software",
                "article", "book", "video", "field trip", "data",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Milestones,
        StepRules {
            min_words: 1,
            max_item_words: Some(8),
            disallow: vec![
                DisallowRule::matches(
                    ACTIVITY_SUBJECT,
                    RejectionKind::ActivityNotDeliverable,
                    ACTIVITY_REASON,
                ),
                DisallowRule::matches(
                    BARE_ACTIVITY,
                    RejectionKind::ActivityNotDeliverable,
                    ACTIVITY_REASON,
                ),
            ],
            vocabulary: &[
                "report", "proposal", "presentation", "prototype", "model", "brief", "podcast",
                "exhibit", "exhibition", "portfolio", "video", "campaign", "plan", "website",
                "essay", "poster", "infographic", "journal", "documentary", "pitch", "map",
                "guide", "blueprint", "book", "article", "letter", "display", "performance",
                "app", "design", "product", "policy", "speech", "mural", "zine", "showcase",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Descriptions,
        StepRules {
            min_words: 5,
            max_item_words: None,
            disallow: vec![DisallowRule::matches(
                TRADITIONAL_TESTING,
                RejectionKind::TraditionalAssessment,
                "Describe the product itself (its audience, format, and what it must include) rather than a test.",
            )],
            vocabulary: &[
                "audience", "community", "panel", "stakeholders", "parents", "experts", "format",
                "slides", "pages", "minutes", "written", "visual", "digital", "oral", "include",
                "present", "publish", "share",
            ],
            vocabulary_required: false,
            vocabulary_reason: "",
        },
    );

    rules.insert(
        StepId::Assessment,
        StepRules {
            min_words: 1,
            max_item_words: Some(12),
            disallow: vec![DisallowRule::matches(
                TRADITIONAL_TESTING,
                RejectionKind::TraditionalAssessment,
                TESTING_REASON,
            )],
            vocabulary: &[
                "rubric", "rubrics", "portfolio", "peer review", "peer feedback", "peer critique",
                "self-assessment", "self assessment", "reflection", "presentation", "exhibition",
                "critique", "conference", "checklist", "observation", "audience", "panel",
                "feedback", "demonstration", "showcase", "journal", "defense", "performance",
            ],
            vocabulary_required: true,
            vocabulary_reason: "Name how the work will be assessed authentically, for example a rubric, peer critique, or a presentation to an audience.",
        },
    );

    rules
});

/// Validates `utterance` as content for `step`.
pub fn validate(utterance: &str, step: StepId) -> Verdict {
    validate_with(utterance, step, ValidationOptions::default())
}

/// Validates `utterance` for `step` with relaxed options.
pub fn validate_with(utterance: &str, step: StepId, options: ValidationOptions) -> Verdict {
    let text = utterance.trim();
    if text.is_empty() {
        return Verdict::reject(
            RejectionKind::Empty,
            format!("Share a {} so we can keep building.", step.label()),
        );
    }

    // A list value must survive item splitting or it can never be written.
    if step.is_list() && split_items(text).is_empty() {
        return Verdict::reject(
            RejectionKind::MissingContent,
            format!("I couldn't find any {} in that. List at least one by name.", step.label()),
        );
    }

    let Some(rules) = RULES.get(&step) else {
        return Verdict::accept(Vec::new());
    };

    if let Some(rule) = rules.disallow.iter().find(|rule| rule.fires(text)) {
        return Verdict::reject(rule.kind, rule.reason);
    }

    if !options.bypass_word_floor && word_count(text) < rules.min_words {
        return Verdict::reject(
            RejectionKind::TooShort,
            format!(
                "Could you say a little more? A {} needs at least {} words.",
                step.label(),
                rules.min_words
            ),
        );
    }

    if let Some(max) = rules.max_item_words {
        let items = if step.is_list() {
            split_items(text)
        } else {
            vec![text.to_string()]
        };
        if items.iter().any(|item| word_count(item) > max) {
            return Verdict::reject(
                RejectionKind::ItemTooLong,
                format!(
                    "Keep each of the {} to a short name of {} words or fewer.",
                    step.label(),
                    max
                ),
            );
        }
    }

    let hits = vocabulary_hits(text, rules.vocabulary);
    if rules.vocabulary_required && hits.is_empty() {
        return Verdict::reject(RejectionKind::MissingVocabulary, rules.vocabulary_reason);
    }

    Verdict::accept(hits)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn vocabulary_hits(text: &str, vocabulary: &[&str]) -> Vec<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    let joined = format!(" {} ", words.join(" "));

    vocabulary
        .iter()
        .filter(|term| joined.contains(&format!(" {} ", term)))
        .map(|term| term.to_string())
        .collect()
}
