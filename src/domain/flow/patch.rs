//! Vetting of backend-proposed data patches.
//!
//! A patch is accepted only as a whole: every entry must name a known step
//! of the current stage, target an empty slot other than the current step,
//! and pass the step validator. Any failing entry discards the patch.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::design::{Project, SlotValue, StepId};

use super::validator::validate;

/// Why a proposed patch was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchRejection {
    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("'{0}' is not part of the current stage")]
    OutsideStage(StepId),

    #[error("'{0}' is the step under discussion")]
    CurrentStep(StepId),

    #[error("'{0}' is filled one entry at a time")]
    PerEntryStep(StepId),

    #[error("'{0}' is already populated")]
    Occupied(StepId),

    #[error("'{0}' must be a string or a list of strings")]
    UnsupportedValue(StepId),

    #[error("'{step}' failed validation: {reason}")]
    Invalid { step: StepId, reason: String },
}

/// Converts a raw patch into slot values, or rejects it whole.
pub fn vet_patch(
    project: &Project,
    patch: &Map<String, Value>,
) -> Result<Vec<SlotValue>, PatchRejection> {
    let mut accepted = Vec::with_capacity(patch.len());

    for (key, value) in patch {
        let step: StepId = key
            .parse()
            .map_err(|_| PatchRejection::UnknownStep(key.clone()))?;

        if step.stage() != project.stage() {
            return Err(PatchRejection::OutsideStage(step));
        }
        if step == project.step() {
            return Err(PatchRejection::CurrentStep(step));
        }
        if step.fills_per_entry() {
            return Err(PatchRejection::PerEntryStep(step));
        }
        if !project.data().is_slot_empty(step) {
            return Err(PatchRejection::Occupied(step));
        }

        let text = patch_text(step, value)?;
        let verdict = validate(&text, step);
        if !verdict.accepted {
            return Err(PatchRejection::Invalid {
                step,
                reason: verdict.reason.unwrap_or_default(),
            });
        }
        accepted.push(SlotValue::new(step, text));
    }

    Ok(accepted)
}

fn patch_text(step: StepId, value: &Value) -> Result<String, PatchRejection> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Array(items) => {
            let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            strings
                .map(|s| s.join("\n"))
                .ok_or(PatchRejection::UnsupportedValue(step))
        }
        _ => Err(PatchRejection::UnsupportedValue(step)),
    }
}
