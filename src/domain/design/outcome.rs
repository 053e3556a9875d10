//! Strategy outcomes: the only input that mutates a project.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::OutcomeId;

use super::step::StepId;

/// The response strategy chosen for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    CompleteStage,
    OfferRefinement,
    AcceptAndAdvance,
    RejectAndCoach,
    StayAndClarify,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CompleteStage => "complete-stage",
            StrategyKind::OfferRefinement => "offer-refinement",
            StrategyKind::AcceptAndAdvance => "accept-and-advance",
            StrategyKind::RejectAndCoach => "reject-and-coach",
            StrategyKind::StayAndClarify => "stay-and-clarify",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value destined for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub step: StepId,
    pub value: String,
}

impl SlotValue {
    pub fn new(step: StepId, value: impl Into<String>) -> Self {
        Self {
            step,
            value: value.into(),
        }
    }
}

/// State change carried by an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Stay on the current step. Resets the help streak.
    Hold,
    /// Stay on the current step and count a help request.
    RecordHelpRequest,
    /// Open (or replace) the refinement offer for the current step.
    OfferRefinement(SlotValue),
    /// Commit the open offer and advance.
    CommitOffer(SlotValue),
    /// Move to the next stage.
    CompleteStage,
    /// Reopen a step of the current or an earlier stage for editing.
    ReopenStep(StepId),
}

/// A decision computed against a specific project revision.
///
/// Applying the same outcome twice is a no-op; applying one computed
/// against an older revision is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub id: OutcomeId,
    pub base_revision: u64,
    pub strategy: StrategyKind,
    pub mutation: Mutation,
    /// Validated backend values for other empty slots of the current stage.
    pub patch: Vec<SlotValue>,
}

impl StrategyOutcome {
    pub fn new(base_revision: u64, strategy: StrategyKind, mutation: Mutation) -> Self {
        Self {
            id: OutcomeId::new(),
            base_revision,
            strategy,
            mutation,
            patch: Vec::new(),
        }
    }

    /// Outcome for an explicit edit request.
    pub fn edit(base_revision: u64, step: StepId) -> Self {
        Self::new(
            base_revision,
            StrategyKind::StayAndClarify,
            Mutation::ReopenStep(step),
        )
    }

    pub fn with_patch(mut self, patch: Vec<SlotValue>) -> Self {
        self.patch = patch;
        self
    }
}
