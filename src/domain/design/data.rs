//! Structured design data captured across stages.
//!
//! Each step owns one slot. Scalar slots hold a single string; list slots
//! hold the items the educator confirmed. Activities and descriptions are
//! filled one parent entry at a time (one phase, one milestone).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::Stage;
use super::step::StepId;

/// How a committed value is written into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Only an empty slot may be written.
    Fill,
    /// The slot is replaced wholesale (explicit edit).
    Replace,
}

/// Errors raised when writing a slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Slot '{0}' is already populated")]
    Occupied(StepId),

    #[error("Slot '{0}' cannot be empty")]
    EmptyValue(StepId),

    #[error("Slot '{0}' has no entry left to fill")]
    NothingToFill(StepId),
}

/// Ideation stage data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub big_idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

/// A named phase of the learning journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activities: Vec::new(),
        }
    }
}

/// Journey stage data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyData {
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A milestone deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Milestone {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }
}

/// Deliverables stage data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverablesData {
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub assessment_methods: Vec<String>,
}

/// All captured design data, grouped per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default)]
    pub ideation: IdeationData,
    #[serde(default)]
    pub journey: JourneyData,
    #[serde(default)]
    pub deliverables: DeliverablesData,
}

impl StructuredData {
    /// True when the slot for `step` holds a committed value.
    ///
    /// Per-entry steps are satisfied once every parent entry is filled.
    pub fn is_step_satisfied(&self, step: StepId) -> bool {
        match step {
            StepId::BigIdea => self.ideation.big_idea.is_some(),
            StepId::EssentialQuestion => self.ideation.essential_question.is_some(),
            StepId::Challenge => self.ideation.challenge.is_some(),
            StepId::Phases => !self.journey.phases.is_empty(),
            StepId::Activities => {
                !self.journey.phases.is_empty()
                    && self.journey.phases.iter().all(|p| !p.activities.is_empty())
            }
            StepId::Resources => !self.journey.resources.is_empty(),
            StepId::Milestones => !self.deliverables.milestones.is_empty(),
            StepId::Descriptions => {
                !self.deliverables.milestones.is_empty()
                    && self
                        .deliverables
                        .milestones
                        .iter()
                        .all(|m| m.description.is_some())
            }
            StepId::Assessment => !self.deliverables.assessment_methods.is_empty(),
        }
    }

    /// True when no part of the slot for `step` has been written.
    pub fn is_slot_empty(&self, step: StepId) -> bool {
        match step {
            StepId::Activities => self.journey.phases.iter().all(|p| p.activities.is_empty()),
            StepId::Descriptions => self
                .deliverables
                .milestones
                .iter()
                .all(|m| m.description.is_none()),
            other => !self.is_step_satisfied(other),
        }
    }

    /// True when every step of `stage` is satisfied. `Complete` always is.
    pub fn is_stage_satisfied(&self, stage: Stage) -> bool {
        stage.steps().iter().all(|step| self.is_step_satisfied(*step))
    }

    /// First step of `stage` that still needs a value.
    pub fn first_unsatisfied_step(&self, stage: Stage) -> Option<StepId> {
        stage
            .steps()
            .iter()
            .copied()
            .find(|step| !self.is_step_satisfied(*step))
    }

    /// Name of the phase or milestone a per-entry step is currently filling.
    pub fn pending_target(&self, step: StepId) -> Option<String> {
        match step {
            StepId::Activities => self
                .journey
                .phases
                .iter()
                .find(|p| p.activities.is_empty())
                .map(|p| p.name.clone()),
            StepId::Descriptions => self
                .deliverables
                .milestones
                .iter()
                .find(|m| m.description.is_none())
                .map(|m| m.title.clone()),
            _ => None,
        }
    }

    /// Writes a confirmed value into the slot for `step`.
    pub fn write(&mut self, step: StepId, value: &str, mode: WriteMode) -> Result<(), SlotError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SlotError::EmptyValue(step));
        }

        if mode == WriteMode::Fill && !step.fills_per_entry() && self.is_step_satisfied(step) {
            return Err(SlotError::Occupied(step));
        }

        match step {
            StepId::BigIdea => self.ideation.big_idea = Some(value.to_string()),
            StepId::EssentialQuestion => {
                self.ideation.essential_question = Some(value.to_string())
            }
            StepId::Challenge => self.ideation.challenge = Some(value.to_string()),
            StepId::Phases => {
                let previous = std::mem::take(&mut self.journey.phases);
                self.journey.phases = non_empty_items(step, value)?
                    .into_iter()
                    .map(|name| {
                        let activities = previous
                            .iter()
                            .find(|p| p.name.eq_ignore_ascii_case(&name))
                            .map(|p| p.activities.clone())
                            .unwrap_or_default();
                        Phase { name, activities }
                    })
                    .collect();
            }
            StepId::Activities => {
                let items = non_empty_items(step, value)?;
                let phase = self
                    .journey
                    .phases
                    .iter_mut()
                    .find(|p| p.activities.is_empty())
                    .ok_or(SlotError::NothingToFill(step))?;
                phase.activities = items;
            }
            StepId::Resources => self.journey.resources = non_empty_items(step, value)?,
            StepId::Milestones => {
                let previous = std::mem::take(&mut self.deliverables.milestones);
                self.deliverables.milestones = non_empty_items(step, value)?
                    .into_iter()
                    .map(|title| {
                        let description = previous
                            .iter()
                            .find(|m| m.title.eq_ignore_ascii_case(&title))
                            .and_then(|m| m.description.clone());
                        Milestone { title, description }
                    })
                    .collect();
            }
            StepId::Descriptions => {
                let milestone = self
                    .deliverables
                    .milestones
                    .iter_mut()
                    .find(|m| m.description.is_none())
                    .ok_or(SlotError::NothingToFill(step))?;
                milestone.description = Some(value.to_string());
            }
            StepId::Assessment => {
                self.deliverables.assessment_methods = non_empty_items(step, value)?
            }
        }
        Ok(())
    }

    /// Clears the per-entry values of `step` so they can be captured again.
    pub fn reset_entries(&mut self, step: StepId) {
        match step {
            StepId::Activities => {
                for phase in &mut self.journey.phases {
                    phase.activities.clear();
                }
            }
            StepId::Descriptions => {
                for milestone in &mut self.deliverables.milestones {
                    milestone.description = None;
                }
            }
            _ => {}
        }
    }

    /// Plain-text recap of what a stage captured.
    pub fn summarize(&self, stage: Stage) -> String {
        let mut lines = Vec::new();
        match stage {
            Stage::Ideation => {
                push_scalar(&mut lines, "Big idea", &self.ideation.big_idea);
                push_scalar(
                    &mut lines,
                    "Essential question",
                    &self.ideation.essential_question,
                );
                push_scalar(&mut lines, "Challenge", &self.ideation.challenge);
            }
            Stage::Journey => {
                for phase in &self.journey.phases {
                    if phase.activities.is_empty() {
                        lines.push(format!("Phase: {}", phase.name));
                    } else {
                        lines.push(format!(
                            "Phase: {} ({})",
                            phase.name,
                            phase.activities.join("; ")
                        ));
                    }
                }
                if !self.journey.resources.is_empty() {
                    lines.push(format!("Resources: {}", self.journey.resources.join(", ")));
                }
            }
            Stage::Deliverables => {
                for milestone in &self.deliverables.milestones {
                    match &milestone.description {
                        Some(description) => {
                            lines.push(format!("Milestone: {}: {}", milestone.title, description))
                        }
                        None => lines.push(format!("Milestone: {}", milestone.title)),
                    }
                }
                if !self.deliverables.assessment_methods.is_empty() {
                    lines.push(format!(
                        "Assessment: {}",
                        self.deliverables.assessment_methods.join(", ")
                    ));
                }
            }
            Stage::Complete => {
                for stage in [Stage::Ideation, Stage::Journey, Stage::Deliverables] {
                    let section = self.summarize(stage);
                    if !section.is_empty() {
                        lines.push(format!("{}:\n{}", stage.label(), section));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

fn push_scalar(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        lines.push(format!("{}: {}", label, value));
    }
}

fn non_empty_items(step: StepId, value: &str) -> Result<Vec<String>, SlotError> {
    let items = split_items(value);
    if items.is_empty() {
        Err(SlotError::EmptyValue(step))
    } else {
        Ok(items)
    }
}

/// Splits a list answer into items.
///
/// Items are separated by newlines, semicolons, or commas. Leading bullets
/// and numbering are removed and blanks are dropped.
pub fn split_items(value: &str) -> Vec<String> {
    value
        .split(['\n', ';', ','])
        .map(strip_list_marker)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(item: &str) -> &str {
    let item = item.trim();
    let item = item.trim_start_matches(['-', '*', '•']).trim_start();

    let digits = item.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &item[digits..];
        if let Some(stripped) = rest.strip_prefix(['.', ')']) {
            return stripped.trim();
        }
    }
    item.trim()
}
