//! Design Backend Port - Generates the assistant's next message.
//!
//! The engine composes a [`PromptContext`] after choosing a strategy and asks
//! the backend for a reply biased by that strategy. Replies are untrusted:
//! text is only presented, and any proposed data patch is re-validated
//! before it can reach the project.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::design::{ConversationTurn, Stage, StepId, StrategyKind, StructuredData};
use crate::domain::foundation::ProjectId;

/// Port for generating assistant replies.
#[async_trait]
pub trait DesignBackend: Send + Sync {
    /// Generate the reply for one turn.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when no usable reply could be produced. The
    /// engine falls back to local text in that case.
    async fn generate(&self, context: &PromptContext) -> Result<BackendReply, BackendError>;
}

/// Everything the backend needs to write the next message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    pub project_id: ProjectId,
    pub stage: Stage,
    pub step: StepId,
    pub strategy: StrategyKind,
    /// Strategy-specific instruction for the reply.
    pub directive: String,
    pub data: StructuredData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_value: Option<String>,
    pub recent_turns: Vec<ConversationTurn>,
    pub user_utterance: String,
    /// How many suggestions the reply should carry.
    pub requested_suggestions: usize,
}

/// A structured reply from the backend. Every field but the text is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendReply {
    #[serde(default)]
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_data_patch: Option<Map<String, Value>>,
    /// Kept raw; the engine parses and checks it against its own position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_next_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_complete: Option<bool>,
}

impl BackendReply {
    /// Reply carrying only display text.
    pub fn text(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            ..Self::default()
        }
    }
}

/// Backend failures. All of them are recoverable by local fallback.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timed out after {0}s")]
    Timeout(u64),

    #[error("backend reply unusable: {0}")]
    InvalidReply(String),
}
