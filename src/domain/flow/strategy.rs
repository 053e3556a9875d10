//! Response strategy selection.
//!
//! Combines the classification, the validator verdict, and the project's
//! conversational state (open refinement offer, help streak) into exactly
//! one strategy. Rules are evaluated in priority order; the first match wins:
//!
//! 1. stage already settled → complete-stage
//! 2. validated value, no open offer → offer-refinement
//! 3. confirmation with an open offer → accept-and-advance
//! 4. validated value replacing an open offer → offer-refinement
//! 5. non-trivial rejected value → reject-and-coach
//! 6. what-if selection → stay-and-clarify (restate)
//! 7. help request → stay-and-clarify (coaching prompts, or a nudge once
//!    the help streak reaches the loop threshold)
//! 8. anything else → stay-and-clarify (elaborate)

use crate::domain::design::{
    ConversationTurn, Mutation, Project, SlotValue, StrategyKind, StrategyOutcome,
};

use super::classifier::{classify, Classification};
use super::extraction::extract_what_if_concept;
use super::validator::{validate_with, RejectionKind, ValidationOptions, Verdict};

/// Why the engine stays on the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarifyReason {
    /// A what-if prompt was picked; ask for it in the educator's words.
    WhatIf { concept: Option<String> },
    /// Help was requested; offer coaching prompts.
    HelpRequest,
    /// Help was requested repeatedly; nudge toward committing something.
    HelpLoop,
    /// The educator asked to refine the open offer.
    RefinementRequested,
    /// The utterance was too short or ambiguous to act on.
    NeedsElaboration,
}

/// The strategy chosen for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    CompleteStage,
    OfferRefinement { value: String },
    AcceptAndAdvance { value: String },
    RejectAndCoach { reason: String, kind: RejectionKind },
    StayAndClarify(ClarifyReason),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::CompleteStage => StrategyKind::CompleteStage,
            Strategy::OfferRefinement { .. } => StrategyKind::OfferRefinement,
            Strategy::AcceptAndAdvance { .. } => StrategyKind::AcceptAndAdvance,
            Strategy::RejectAndCoach { .. } => StrategyKind::RejectAndCoach,
            Strategy::StayAndClarify(_) => StrategyKind::StayAndClarify,
        }
    }

    /// Builds the outcome that applies this strategy to `project`.
    pub fn to_outcome(&self, project: &Project) -> StrategyOutcome {
        let step = project.step();
        let mutation = match self {
            Strategy::CompleteStage => Mutation::CompleteStage,
            Strategy::OfferRefinement { value } => {
                Mutation::OfferRefinement(SlotValue::new(step, value.clone()))
            }
            Strategy::AcceptAndAdvance { value } => {
                Mutation::CommitOffer(SlotValue::new(step, value.clone()))
            }
            Strategy::StayAndClarify(ClarifyReason::HelpRequest)
            | Strategy::StayAndClarify(ClarifyReason::HelpLoop) => Mutation::RecordHelpRequest,
            Strategy::RejectAndCoach { .. } | Strategy::StayAndClarify(_) => Mutation::Hold,
        };
        StrategyOutcome::new(project.revision(), self.kind(), mutation)
    }
}

/// Tunables for strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorConfig {
    /// Consecutive help requests (including the current one) that trigger
    /// the nudge instead of more prompts.
    pub help_loop_threshold: u32,
    /// Rejected utterances shorter than this are asked to elaborate.
    pub min_content_words: usize,
    /// Coaching prompts requested from the backend.
    pub coaching_prompt_count: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            help_loop_threshold: 2,
            min_content_words: 3,
            coaching_prompt_count: 3,
        }
    }
}

/// Everything the selector looks at for one turn.
#[derive(Debug, Clone)]
pub struct TurnAssessment {
    pub classification: Classification,
    pub verdict: Option<Verdict>,
    pub strategy: Strategy,
}

impl TurnAssessment {
    /// Number of suggestions the backend should generate for this turn.
    pub fn requested_suggestions(&self, config: &SelectorConfig) -> usize {
        match &self.strategy {
            Strategy::RejectAndCoach { .. }
            | Strategy::StayAndClarify(ClarifyReason::HelpRequest)
            | Strategy::StayAndClarify(ClarifyReason::RefinementRequested) => {
                config.coaching_prompt_count
            }
            _ => 0,
        }
    }
}

/// Picks strategies from the decision table.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    config: SelectorConfig,
}

impl StrategySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Classifies, validates, and selects a strategy for `utterance`.
    pub fn assess(
        &self,
        project: &Project,
        utterance: &str,
        prior_assistant_turn: Option<&ConversationTurn>,
        prior_suggestions: &[String],
    ) -> TurnAssessment {
        let classification = classify(utterance, prior_assistant_turn, prior_suggestions);

        let verdict = match (&classification.proposed_value, classification.skip_validation) {
            (Some(value), false) => Some(validate_with(
                value,
                project.step(),
                ValidationOptions {
                    bypass_word_floor: classification.is_suggestion_selection,
                },
            )),
            _ => None,
        };

        let strategy = self.select(project, utterance, &classification, verdict.as_ref());
        TurnAssessment {
            classification,
            verdict,
            strategy,
        }
    }

    /// Applies the decision table.
    pub fn select(
        &self,
        project: &Project,
        utterance: &str,
        classification: &Classification,
        verdict: Option<&Verdict>,
    ) -> Strategy {
        if project.is_stage_settled() {
            return Strategy::CompleteStage;
        }

        let open_offer = project
            .open_offer()
            .filter(|offer| offer.step == project.step());
        let accepted_value = verdict
            .filter(|v| v.accepted)
            .and(classification.proposed_value.clone());

        if let (Some(value), None) = (&accepted_value, open_offer) {
            return Strategy::OfferRefinement {
                value: value.clone(),
            };
        }

        if let (true, Some(offer)) = (classification.is_confirmation, open_offer) {
            return Strategy::AcceptAndAdvance {
                value: offer.value.clone(),
            };
        }

        if let Some(value) = accepted_value {
            return Strategy::OfferRefinement { value };
        }

        if let Some(rejected) = verdict.filter(|v| !v.accepted) {
            if utterance.split_whitespace().count() >= self.config.min_content_words {
                return Strategy::RejectAndCoach {
                    reason: rejected.reason.clone().unwrap_or_default(),
                    kind: rejected.kind.unwrap_or(RejectionKind::MissingContent),
                };
            }
        }

        if classification.is_what_if_selection {
            let source = classification
                .matched_suggestion
                .as_deref()
                .unwrap_or(utterance);
            return Strategy::StayAndClarify(ClarifyReason::WhatIf {
                concept: extract_what_if_concept(source),
            });
        }

        if classification.is_help_request {
            let streak = project.consecutive_help_count().saturating_add(1);
            return if streak >= self.config.help_loop_threshold {
                Strategy::StayAndClarify(ClarifyReason::HelpLoop)
            } else {
                Strategy::StayAndClarify(ClarifyReason::HelpRequest)
            };
        }

        if classification.is_refinement_request && open_offer.is_some() {
            return Strategy::StayAndClarify(ClarifyReason::RefinementRequested);
        }

        Strategy::StayAndClarify(ClarifyReason::NeedsElaboration)
    }
}
