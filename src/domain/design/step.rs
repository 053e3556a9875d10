//! Step identifiers within design stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

use super::stage::Stage;

/// A single data-capture unit within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepId {
    BigIdea,
    EssentialQuestion,
    Challenge,
    Phases,
    Activities,
    Resources,
    Milestones,
    Descriptions,
    Assessment,
}

impl StepId {
    /// Returns every step in flow order.
    pub fn all() -> [StepId; 9] {
        [
            StepId::BigIdea,
            StepId::EssentialQuestion,
            StepId::Challenge,
            StepId::Phases,
            StepId::Activities,
            StepId::Resources,
            StepId::Milestones,
            StepId::Descriptions,
            StepId::Assessment,
        ]
    }

    /// The stage this step belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            StepId::BigIdea | StepId::EssentialQuestion | StepId::Challenge => Stage::Ideation,
            StepId::Phases | StepId::Activities | StepId::Resources => Stage::Journey,
            StepId::Milestones | StepId::Descriptions | StepId::Assessment => {
                Stage::Deliverables
            }
        }
    }

    /// Wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::BigIdea => "bigIdea",
            StepId::EssentialQuestion => "essentialQuestion",
            StepId::Challenge => "challenge",
            StepId::Phases => "phases",
            StepId::Activities => "activities",
            StepId::Resources => "resources",
            StepId::Milestones => "milestones",
            StepId::Descriptions => "descriptions",
            StepId::Assessment => "assessment",
        }
    }

    /// Name used when talking to the educator.
    pub fn label(&self) -> &'static str {
        match self {
            StepId::BigIdea => "big idea",
            StepId::EssentialQuestion => "essential question",
            StepId::Challenge => "challenge",
            StepId::Phases => "learning phases",
            StepId::Activities => "phase activities",
            StepId::Resources => "resources",
            StepId::Milestones => "milestone deliverables",
            StepId::Descriptions => "deliverable description",
            StepId::Assessment => "assessment methods",
        }
    }

    /// True when a committed value is split into a list of items.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            StepId::Phases
                | StepId::Activities
                | StepId::Resources
                | StepId::Milestones
                | StepId::Assessment
        )
    }

    /// True for steps that fill one entry of an earlier list at a time.
    pub fn fills_per_entry(&self) -> bool {
        matches!(self, StepId::Activities | StepId::Descriptions)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = ValidationError;

    /// Accepts the camelCase wire name, snake_case, or the spoken label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        let step = match normalized.as_str() {
            "bigidea" => StepId::BigIdea,
            "essentialquestion" => StepId::EssentialQuestion,
            "challenge" => StepId::Challenge,
            "phases" | "learningphases" => StepId::Phases,
            "activities" | "phaseactivities" => StepId::Activities,
            "resources" => StepId::Resources,
            "milestones" | "milestonedeliverables" => StepId::Milestones,
            "descriptions" | "deliverabledescription" => StepId::Descriptions,
            "assessment" | "assessmentmethods" => StepId::Assessment,
            _ => {
                return Err(ValidationError::invalid_format(
                    "step",
                    format!("unknown step '{}'", s.trim()),
                ))
            }
        };
        Ok(step)
    }
}
