//! Design stages and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

use super::step::StepId;

/// Top-level phase of a project-based-learning design.
///
/// Stages run strictly forward: Ideation → Journey → Deliverables → Complete.
/// Going back is only possible through an explicit edit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Big idea, essential question, and challenge.
    #[default]
    Ideation,
    /// Phases, activities, and resources of the learning journey.
    Journey,
    /// Milestones, their descriptions, and assessment.
    Deliverables,
    /// Every stage is satisfied; the design is ready for export.
    Complete,
}

const IDEATION_STEPS: [StepId; 3] = [
    StepId::BigIdea,
    StepId::EssentialQuestion,
    StepId::Challenge,
];

const JOURNEY_STEPS: [StepId; 3] = [StepId::Phases, StepId::Activities, StepId::Resources];

const DELIVERABLES_STEPS: [StepId; 3] = [
    StepId::Milestones,
    StepId::Descriptions,
    StepId::Assessment,
];

impl Stage {
    /// Returns all stages in flow order.
    pub fn all() -> [Stage; 4] {
        [
            Stage::Ideation,
            Stage::Journey,
            Stage::Deliverables,
            Stage::Complete,
        ]
    }

    /// Returns the steps of this stage in order. `Complete` has none.
    pub fn steps(&self) -> &'static [StepId] {
        match self {
            Stage::Ideation => &IDEATION_STEPS,
            Stage::Journey => &JOURNEY_STEPS,
            Stage::Deliverables => &DELIVERABLES_STEPS,
            Stage::Complete => &[],
        }
    }

    /// Returns the first step of this stage.
    pub fn first_step(&self) -> Option<StepId> {
        self.steps().first().copied()
    }

    /// Returns the stage that follows this one.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Ideation => Some(Stage::Journey),
            Stage::Journey => Some(Stage::Deliverables),
            Stage::Deliverables => Some(Stage::Complete),
            Stage::Complete => None,
        }
    }

    /// Position of the stage in the flow, starting at zero.
    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::Ideation => 0,
            Stage::Journey => 1,
            Stage::Deliverables => 2,
            Stage::Complete => 3,
        }
    }

    /// Human-readable name used in prompts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Ideation => "Ideation",
            Stage::Journey => "Learning Journey",
            Stage::Deliverables => "Deliverables",
            Stage::Complete => "Complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl StateMachine for Stage {
    fn can_transition_to(&self, target: &Self) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (Ideation, Journey) | (Journey, Deliverables) | (Deliverables, Complete)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        self.next().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stage_is_ideation() {
        assert_eq!(Stage::default(), Stage::Ideation);
    }

    #[test]
    fn every_working_stage_has_three_steps() {
        for stage in [Stage::Ideation, Stage::Journey, Stage::Deliverables] {
            assert_eq!(stage.steps().len(), 3);
            for step in stage.steps() {
                assert_eq!(step.stage(), stage);
            }
        }
        assert!(Stage::Complete.steps().is_empty());
        assert_eq!(Stage::Complete.first_step(), None);
    }

    #[test]
    fn stages_progress_strictly_forward() {
        assert!(Stage::Ideation.can_transition_to(&Stage::Journey));
        assert!(Stage::Journey.can_transition_to(&Stage::Deliverables));
        assert!(Stage::Deliverables.can_transition_to(&Stage::Complete));
        assert!(!Stage::Ideation.can_transition_to(&Stage::Deliverables));
        assert!(!Stage::Journey.can_transition_to(&Stage::Ideation));
    }

    #[test]
    fn complete_is_terminal() {
        assert!(Stage::Complete.is_terminal());
        assert!(Stage::Complete.transition_to(Stage::Ideation).is_err());
        assert!(!Stage::Deliverables.is_terminal());
    }

    #[test]
    fn ordinals_follow_flow_order() {
        let ordinals: Vec<u8> = Stage::all().iter().map(Stage::ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&Stage::Deliverables).unwrap();
        assert_eq!(json, "\"deliverables\"");
    }
}
