//! Records handed to the presentation layer.

use serde::Serialize;

use crate::domain::design::{Stage, StepId, StrategyKind};
use crate::domain::foundation::{ErrorCode, ProjectId};

/// Non-fatal problems encountered during a turn.
///
/// The conversation continues in every case; warnings only explain why the
/// reply came from local text or why a save may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EngineWarning {
    /// The backend failed, timed out, or returned nothing usable.
    BackendUnavailable(String),
    /// The backend proposed a data patch that was discarded.
    InvalidPatchFromBackend(String),
    /// The backend's step or stage hint disagreed with the engine.
    IgnoredBackendHint(String),
    /// The project could not be saved.
    PersistenceFailure(String),
}

impl EngineWarning {
    /// Error code a caller can log or branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineWarning::BackendUnavailable(_) | EngineWarning::IgnoredBackendHint(_) => {
                ErrorCode::BackendUnavailable
            }
            EngineWarning::InvalidPatchFromBackend(_) => ErrorCode::InvalidBackendPatch,
            EngineWarning::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
        }
    }
}

/// One assistant message, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub project_id: ProjectId,
    pub display_text: String,
    pub suggestions: Vec<String>,
    pub is_stage_complete: bool,
    pub current_stage: Stage,
    pub current_step: StepId,
    /// Strategy behind the reply; `None` for openings and edit prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub revision: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EngineWarning>,
}

impl TurnRecord {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_presentation_fields() {
        let record = TurnRecord {
            project_id: ProjectId::new(),
            display_text: "Hello".to_string(),
            suggestions: vec!["A".to_string()],
            is_stage_complete: false,
            current_stage: Stage::Ideation,
            current_step: StepId::BigIdea,
            strategy: None,
            revision: 0,
            warnings: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["displayText"], "Hello");
        assert_eq!(json["isStageComplete"], false);
        assert_eq!(json["currentStep"], "bigIdea");
        assert_eq!(json["currentStage"], "ideation");
        assert!(json.get("warnings").is_none());
        assert!(!record.has_warnings());
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let json =
            serde_json::to_value(EngineWarning::PersistenceFailure("disk full".to_string()))
                .unwrap();
        assert_eq!(json["kind"], "persistence_failure");
        assert_eq!(json["detail"], "disk full");
    }

    #[test]
    fn warnings_map_to_error_codes() {
        assert_eq!(
            EngineWarning::InvalidPatchFromBackend("x".to_string()).code(),
            ErrorCode::InvalidBackendPatch
        );
        assert_eq!(
            EngineWarning::PersistenceFailure("x".to_string()).code(),
            ErrorCode::PersistenceFailure
        );
    }
}
