//! Project aggregate: the design being built and its flow position.
//!
//! The project is only ever mutated through [`Project::apply`], which takes a
//! [`StrategyOutcome`] computed against a specific revision. Applying is
//! all-or-nothing: the outcome is applied to a copy which replaces the
//! project only when every part of it succeeded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, OutcomeId, ProjectId, StateMachine, Timestamp,
};

use super::data::{SlotError, StructuredData, WriteMode};
use super::outcome::{Mutation, SlotValue, StrategyOutcome};
use super::stage::Stage;
use super::step::StepId;

/// A validated value waiting for the educator's confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementOffer {
    pub step: StepId,
    pub value: String,
}

/// Errors raised when an outcome cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid transition request: {0}")]
    InvalidTransitionRequest(String),

    #[error("Stale outcome: computed against revision {expected}, project is at {actual}")]
    StaleOutcome { expected: u64, actual: u64 },

    #[error("No open refinement offer for '{0}' matches the confirmed value")]
    OfferMismatch(StepId),

    #[error("Backend patch rejected: {0}")]
    PatchRejected(String),

    #[error(transparent)]
    Slot(#[from] SlotError),
}

impl From<TransitionError> for DomainError {
    fn from(err: TransitionError) -> Self {
        let code = match &err {
            TransitionError::StaleOutcome { .. } => ErrorCode::StaleOutcome,
            TransitionError::PatchRejected(_) => ErrorCode::InvalidBackendPatch,
            _ => ErrorCode::InvalidStateTransition,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Result of a successful [`Project::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// The outcome was applied and the revision advanced.
    Applied {
        from_stage: Stage,
        to_stage: Stage,
        from_step: StepId,
        to_step: StepId,
        revision: u64,
    },
    /// The outcome had already been applied; nothing changed.
    AlreadyApplied,
}

impl ApplyResult {
    /// True when the outcome moved the project into a different stage.
    pub fn stage_changed(&self) -> bool {
        matches!(self, ApplyResult::Applied { from_stage, to_stage, .. } if from_stage != to_stage)
    }
}

/// Read-only projection of a project for prompts and external readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignContext {
    pub project_id: ProjectId,
    pub stage: Stage,
    pub step: StepId,
    pub data: StructuredData,
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editing: Option<StepId>,
}

/// The design project aggregate.
///
/// # Invariants
///
/// - `step` belongs to `stage` (the last Deliverables step once Complete)
/// - `revision` increases by exactly one per applied outcome
/// - a populated slot is only replaced while that step is being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    stage: Stage,
    step: StepId,
    data: StructuredData,
    revision: u64,
    #[serde(default)]
    open_offer: Option<RefinementOffer>,
    #[serde(default)]
    consecutive_help_count: u32,
    #[serde(default)]
    editing: Option<StepId>,
    #[serde(default)]
    last_applied_outcome: Option<OutcomeId>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Project {
    /// Creates a fresh project at the first Ideation step.
    pub fn new(id: ProjectId) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            stage: Stage::Ideation,
            step: StepId::BigIdea,
            data: StructuredData::default(),
            revision: 0,
            open_offer: None,
            consecutive_help_count: 0,
            editing: None,
            last_applied_outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a project at an explicit position (no validation).
    pub fn reconstitute(
        id: ProjectId,
        stage: Stage,
        step: StepId,
        data: StructuredData,
        revision: u64,
    ) -> Self {
        let mut project = Self::new(id);
        project.stage = stage;
        project.step = step;
        project.data = data;
        project.revision = revision;
        project
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn data(&self) -> &StructuredData {
        &self.data
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn open_offer(&self) -> Option<&RefinementOffer> {
        self.open_offer.as_ref()
    }

    pub fn consecutive_help_count(&self) -> u32 {
        self.consecutive_help_count
    }

    /// The step currently reopened by an explicit edit.
    pub fn editing(&self) -> Option<StepId> {
        self.editing
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// True when the current stage is fully captured and nothing is reopened.
    pub fn is_stage_settled(&self) -> bool {
        self.stage != Stage::Complete
            && self.editing.is_none()
            && self.data.is_stage_satisfied(self.stage)
    }

    /// Phase or milestone the current step is filling, if any.
    pub fn pending_target(&self) -> Option<String> {
        self.data.pending_target(self.step)
    }

    /// Snapshot of the project for prompt composition and readers.
    pub fn current_context(&self) -> DesignContext {
        DesignContext {
            project_id: self.id,
            stage: self.stage,
            step: self.step,
            data: self.data.clone(),
            revision: self.revision,
            pending_target: self.pending_target(),
            editing: self.editing,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies a strategy outcome.
    ///
    /// # Errors
    ///
    /// - `InvalidTransitionRequest` on a Complete project (edits excepted)
    ///   or when the mutation does not fit the current position
    /// - `StaleOutcome` if the outcome was computed against another revision
    /// - `OfferMismatch` if a commit does not match the open offer
    /// - `PatchRejected` if a patch entry targets a slot it may not fill
    pub fn apply(&mut self, outcome: &StrategyOutcome) -> Result<ApplyResult, TransitionError> {
        if self.last_applied_outcome == Some(outcome.id) {
            return Ok(ApplyResult::AlreadyApplied);
        }

        if self.stage == Stage::Complete && !matches!(outcome.mutation, Mutation::ReopenStep(_)) {
            return Err(TransitionError::InvalidTransitionRequest(
                "the design is complete; request an edit to change it".to_string(),
            ));
        }

        if outcome.base_revision != self.revision {
            return Err(TransitionError::StaleOutcome {
                expected: outcome.base_revision,
                actual: self.revision,
            });
        }

        let mut next = self.clone();
        next.apply_patch(&outcome.patch)?;
        next.apply_mutation(&outcome.mutation)?;
        next.revision += 1;
        next.last_applied_outcome = Some(outcome.id);
        next.updated_at = Timestamp::now();

        let result = ApplyResult::Applied {
            from_stage: self.stage,
            to_stage: next.stage,
            from_step: self.step,
            to_step: next.step,
            revision: next.revision,
        };
        *self = next;
        Ok(result)
    }

    /// Reopens `step` for editing at the current revision.
    ///
    /// # Errors
    ///
    /// `InvalidTransitionRequest` if `step` belongs to a stage not yet reached.
    pub fn request_edit(&mut self, step: StepId) -> Result<ApplyResult, TransitionError> {
        let outcome = StrategyOutcome::edit(self.revision, step);
        self.apply(&outcome)
    }

    fn apply_patch(&mut self, patch: &[SlotValue]) -> Result<(), TransitionError> {
        for entry in patch {
            if entry.step.stage() != self.stage {
                return Err(TransitionError::PatchRejected(format!(
                    "'{}' is not part of the {} stage",
                    entry.step, self.stage
                )));
            }
            if entry.step == self.step || entry.step.fills_per_entry() {
                return Err(TransitionError::PatchRejected(format!(
                    "'{}' can only be filled through the conversation",
                    entry.step
                )));
            }
            if !self.data.is_slot_empty(entry.step) {
                return Err(TransitionError::PatchRejected(format!(
                    "'{}' is already populated",
                    entry.step
                )));
            }
            self.data.write(entry.step, &entry.value, WriteMode::Fill)?;
        }
        Ok(())
    }

    fn apply_mutation(&mut self, mutation: &Mutation) -> Result<(), TransitionError> {
        match mutation {
            Mutation::Hold => {
                self.consecutive_help_count = 0;
            }
            Mutation::RecordHelpRequest => {
                self.consecutive_help_count = self.consecutive_help_count.saturating_add(1);
            }
            Mutation::OfferRefinement(offer) => {
                if offer.step != self.step {
                    return Err(TransitionError::InvalidTransitionRequest(format!(
                        "cannot offer a value for '{}' while on '{}'",
                        offer.step, self.step
                    )));
                }
                self.open_offer = Some(RefinementOffer {
                    step: offer.step,
                    value: offer.value.clone(),
                });
                self.consecutive_help_count = 0;
            }
            Mutation::CommitOffer(confirmed) => {
                let matches_offer = self
                    .open_offer
                    .as_ref()
                    .is_some_and(|o| o.step == confirmed.step && o.value == confirmed.value);
                if !matches_offer || confirmed.step != self.step {
                    return Err(TransitionError::OfferMismatch(confirmed.step));
                }

                let mode = if self.editing == Some(confirmed.step) {
                    WriteMode::Replace
                } else {
                    WriteMode::Fill
                };
                self.data.write(confirmed.step, &confirmed.value, mode)?;
                self.open_offer = None;
                self.editing = None;
                self.consecutive_help_count = 0;
                self.advance()?;
            }
            Mutation::CompleteStage => {
                if !self.is_stage_settled() {
                    return Err(TransitionError::InvalidTransitionRequest(format!(
                        "the {} stage still has unanswered steps",
                        self.stage
                    )));
                }
                self.open_offer = None;
                self.consecutive_help_count = 0;
                self.advance()?;
            }
            Mutation::ReopenStep(step) => {
                if self.stage != Stage::Complete && step.stage().ordinal() > self.stage.ordinal() {
                    return Err(TransitionError::InvalidTransitionRequest(format!(
                        "'{}' belongs to the {} stage, which has not been reached",
                        step,
                        step.stage()
                    )));
                }
                if step.fills_per_entry() {
                    self.data.reset_entries(*step);
                }
                self.stage = step.stage();
                self.step = *step;
                self.editing = Some(*step);
                self.open_offer = None;
                self.consecutive_help_count = 0;
            }
        }
        Ok(())
    }

    /// Moves to the first unsatisfied step, crossing stage boundaries while
    /// the current stage is fully captured.
    fn advance(&mut self) -> Result<(), TransitionError> {
        loop {
            if let Some(step) = self.data.first_unsatisfied_step(self.stage) {
                self.step = step;
                return Ok(());
            }

            let Some(next) = self.stage.next() else {
                return Ok(());
            };
            self.stage = self
                .stage
                .transition_to(next)
                .map_err(|e| TransitionError::InvalidTransitionRequest(e.to_string()))?;

            if self.stage == Stage::Complete {
                self.step = StepId::Assessment;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::design::outcome::StrategyKind;

    fn offer(project: &Project, value: &str) -> StrategyOutcome {
        StrategyOutcome::new(
            project.revision(),
            StrategyKind::OfferRefinement,
            Mutation::OfferRefinement(SlotValue::new(project.step(), value)),
        )
    }

    fn commit(project: &Project, value: &str) -> StrategyOutcome {
        StrategyOutcome::new(
            project.revision(),
            StrategyKind::AcceptAndAdvance,
            Mutation::CommitOffer(SlotValue::new(project.step(), value)),
        )
    }

    fn confirm(project: &mut Project, value: &str) {
        project.apply(&offer(project, value)).unwrap();
        project.apply(&commit(project, value)).unwrap();
    }

    fn project_at_milestones() -> Project {
        let mut project = Project::new(ProjectId::new());
        confirm(&mut project, "Water connects every community");
        confirm(&mut project, "How might we protect our creek?");
        confirm(&mut project, "Design a creek restoration plan");
        confirm(&mut project, "Investigate");
        confirm(&mut project, "Interview local ecologists");
        confirm(&mut project, "Field guides");
        project
    }

    #[test]
    fn new_project_starts_at_big_idea() {
        let project = Project::new(ProjectId::new());
        assert_eq!(project.stage(), Stage::Ideation);
        assert_eq!(project.step(), StepId::BigIdea);
        assert_eq!(project.revision(), 0);
        assert!(project.open_offer().is_none());
    }

    #[test]
    fn offer_then_commit_writes_slot_and_advances() {
        let mut project = Project::new(ProjectId::new());
        project.apply(&offer(&project, "Water connects us")).unwrap();
        assert_eq!(project.open_offer().unwrap().value, "Water connects us");
        assert!(project.data().ideation.big_idea.is_none());

        let result = project.apply(&commit(&project, "Water connects us")).unwrap();
        assert!(!result.stage_changed());
        assert_eq!(project.data().ideation.big_idea.as_deref(), Some("Water connects us"));
        assert_eq!(project.step(), StepId::EssentialQuestion);
        assert!(project.open_offer().is_none());
        assert_eq!(project.revision(), 2);
    }

    #[test]
    fn commit_on_last_step_transitions_stage() {
        let mut project = Project::new(ProjectId::new());
        confirm(&mut project, "Water connects us");
        confirm(&mut project, "How might we protect our creek?");
        project.apply(&offer(&project, "Restore the creek")).unwrap();

        let result = project.apply(&commit(&project, "Restore the creek")).unwrap();
        assert!(result.stage_changed());
        assert_eq!(project.stage(), Stage::Journey);
        assert_eq!(project.step(), StepId::Phases);
    }

    #[test]
    fn commit_without_matching_offer_is_rejected() {
        let mut project = Project::new(ProjectId::new());
        project.apply(&offer(&project, "Water connects us")).unwrap();

        let err = project.apply(&commit(&project, "Something else")).unwrap_err();
        assert_eq!(err, TransitionError::OfferMismatch(StepId::BigIdea));
        assert_eq!(project.revision(), 1);
    }

    #[test]
    fn applying_same_outcome_twice_is_a_no_op() {
        let mut project = Project::new(ProjectId::new());
        let outcome = offer(&project, "Water connects us");
        project.apply(&outcome).unwrap();
        let snapshot = project.clone();

        assert_eq!(project.apply(&outcome).unwrap(), ApplyResult::AlreadyApplied);
        assert_eq!(project, snapshot);
    }

    #[test]
    fn stale_outcome_is_rejected() {
        let mut project = Project::new(ProjectId::new());
        let stale = offer(&project, "First");
        project.apply(&offer(&project, "Second")).unwrap();

        let err = project.apply(&stale).unwrap_err();
        assert_eq!(err, TransitionError::StaleOutcome { expected: 0, actual: 1 });
        assert_eq!(project.open_offer().unwrap().value, "Second");
    }

    #[test]
    fn help_requests_accumulate_and_reset() {
        let mut project = Project::new(ProjectId::new());
        for _ in 0..2 {
            let help = StrategyOutcome::new(
                project.revision(),
                StrategyKind::StayAndClarify,
                Mutation::RecordHelpRequest,
            );
            project.apply(&help).unwrap();
        }
        assert_eq!(project.consecutive_help_count(), 2);

        let hold = StrategyOutcome::new(
            project.revision(),
            StrategyKind::RejectAndCoach,
            Mutation::Hold,
        );
        project.apply(&hold).unwrap();
        assert_eq!(project.consecutive_help_count(), 0);
    }

    #[test]
    fn complete_stage_requires_satisfied_stage() {
        let mut project = Project::new(ProjectId::new());
        let outcome = StrategyOutcome::new(0, StrategyKind::CompleteStage, Mutation::CompleteStage);
        assert!(matches!(
            project.apply(&outcome),
            Err(TransitionError::InvalidTransitionRequest(_))
        ));
    }

    #[test]
    fn complete_stage_moves_reconstituted_project_forward() {
        let mut data = StructuredData::default();
        data.write(StepId::BigIdea, "Water connects us", WriteMode::Fill).unwrap();
        data.write(StepId::EssentialQuestion, "How might we help?", WriteMode::Fill).unwrap();
        data.write(StepId::Challenge, "Restore the creek", WriteMode::Fill).unwrap();
        let mut project =
            Project::reconstitute(ProjectId::new(), Stage::Ideation, StepId::Challenge, data, 7);
        assert!(project.is_stage_settled());

        let outcome = StrategyOutcome::new(7, StrategyKind::CompleteStage, Mutation::CompleteStage);
        project.apply(&outcome).unwrap();
        assert_eq!(project.stage(), Stage::Journey);
        assert_eq!(project.step(), StepId::Phases);
    }

    #[test]
    fn patch_fills_other_empty_slots_of_current_stage() {
        let mut project = Project::new(ProjectId::new());
        let outcome = offer(&project, "Water connects us").with_patch(vec![SlotValue::new(
            StepId::Challenge,
            "Restore the creek",
        )]);
        project.apply(&outcome).unwrap();
        assert_eq!(project.data().ideation.challenge.as_deref(), Some("Restore the creek"));

        confirm_open_offer(&mut project);
        confirm(&mut project, "How might we protect our creek?");
        assert_eq!(project.stage(), Stage::Journey);
    }

    fn confirm_open_offer(project: &mut Project) {
        let value = project.open_offer().unwrap().value.clone();
        project.apply(&commit(project, &value)).unwrap();
    }

    #[test]
    fn patch_targeting_current_step_rejects_whole_outcome() {
        let mut project = Project::new(ProjectId::new());
        let outcome = offer(&project, "Water connects us").with_patch(vec![
            SlotValue::new(StepId::Challenge, "Restore the creek"),
            SlotValue::new(StepId::BigIdea, "Other idea"),
        ]);

        assert!(matches!(
            project.apply(&outcome),
            Err(TransitionError::PatchRejected(_))
        ));
        assert!(project.data().ideation.challenge.is_none());
        assert!(project.open_offer().is_none());
        assert_eq!(project.revision(), 0);
    }

    #[test]
    fn patch_outside_current_stage_is_rejected() {
        let mut project = Project::new(ProjectId::new());
        let outcome = StrategyOutcome::new(0, StrategyKind::StayAndClarify, Mutation::Hold)
            .with_patch(vec![SlotValue::new(StepId::Resources, "Library")]);
        assert!(matches!(
            project.apply(&outcome),
            Err(TransitionError::PatchRejected(_))
        ));
    }

    #[test]
    fn descriptions_walk_each_milestone() {
        let mut project = project_at_milestones();
        assert_eq!(project.step(), StepId::Milestones);

        confirm(&mut project, "Research Report, Policy Brief");
        assert_eq!(project.step(), StepId::Descriptions);
        assert_eq!(project.pending_target().as_deref(), Some("Research Report"));

        confirm(&mut project, "A report on creek health for the city council");
        assert_eq!(project.step(), StepId::Descriptions);
        assert_eq!(project.pending_target().as_deref(), Some("Policy Brief"));

        confirm(&mut project, "A one page brief with three recommendations");
        assert_eq!(project.step(), StepId::Assessment);
    }

    #[test]
    fn completing_deliverables_reaches_complete_and_freezes_project() {
        let mut project = project_at_milestones();
        confirm(&mut project, "Research Report");
        confirm(&mut project, "A report for the city council");
        confirm(&mut project, "Rubric and public presentation");
        assert!(project.is_complete());

        let err = project
            .apply(&StrategyOutcome::new(
                project.revision(),
                StrategyKind::StayAndClarify,
                Mutation::Hold,
            ))
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransitionRequest(_)));
    }

    #[test]
    fn edit_replaces_value_and_resumes() {
        let mut project = project_at_milestones();
        project
            .apply(&StrategyOutcome::edit(project.revision(), StepId::BigIdea))
            .unwrap();
        assert_eq!(project.stage(), Stage::Ideation);
        assert_eq!(project.step(), StepId::BigIdea);
        assert!(!project.is_stage_settled());

        confirm(&mut project, "Rivers shape cities");
        assert_eq!(project.data().ideation.big_idea.as_deref(), Some("Rivers shape cities"));
        assert_eq!(project.stage(), Stage::Deliverables);
        assert_eq!(project.step(), StepId::Milestones);
        assert!(project.editing().is_none());
    }

    #[test]
    fn edit_from_complete_returns_to_complete() {
        let mut project = project_at_milestones();
        confirm(&mut project, "Research Report");
        confirm(&mut project, "A report for the city council");
        confirm(&mut project, "Rubric");
        assert!(project.is_complete());

        project
            .apply(&StrategyOutcome::edit(project.revision(), StepId::Assessment))
            .unwrap();
        assert_eq!(project.stage(), Stage::Deliverables);
        confirm(&mut project, "Portfolio review");
        assert!(project.is_complete());
        assert_eq!(
            project.data().deliverables.assessment_methods,
            vec!["Portfolio review"]
        );
    }

    #[test]
    fn editing_future_stage_is_rejected() {
        let mut project = Project::new(ProjectId::new());
        let err = project.request_edit(StepId::Milestones).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransitionRequest(_)));
        assert_eq!(project.revision(), 0);
    }

    #[test]
    fn transition_error_maps_to_domain_error_codes() {
        let stale: DomainError = TransitionError::StaleOutcome { expected: 1, actual: 2 }.into();
        assert_eq!(stale.code, ErrorCode::StaleOutcome);
        let invalid: DomainError =
            TransitionError::InvalidTransitionRequest("x".to_string()).into();
        assert_eq!(invalid.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn context_exposes_position_and_pending_target() {
        let mut project = project_at_milestones();
        confirm(&mut project, "Research Report");
        let context = project.current_context();
        assert_eq!(context.stage, Stage::Deliverables);
        assert_eq!(context.step, StepId::Descriptions);
        assert_eq!(context.pending_target.as_deref(), Some("Research Report"));
    }
}
