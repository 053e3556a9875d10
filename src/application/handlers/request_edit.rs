//! RequestEditHandler - Reopens an earlier step for editing.
//!
//! An edit counts as new input: it supersedes any turn still waiting on
//! the backend for the same project.

use std::sync::Arc;

use thiserror::Error;

use crate::application::presentation::{EngineWarning, TurnRecord};
use crate::application::session::{resume, SessionError, SessionRegistry};
use crate::domain::design::{ConversationTurn, StepId, TransitionError};
use crate::domain::flow::templates;
use crate::domain::foundation::{DomainError, ErrorCode, ProjectId};
use crate::ports::ProjectStore;

/// Command to reopen a step.
#[derive(Debug, Clone)]
pub struct RequestEditCommand {
    pub project_id: ProjectId,
    pub step: StepId,
}

#[derive(Debug, Error)]
pub enum RequestEditError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Edit was superseded by newer input")]
    Superseded,

    #[error("Edit rejected: {0}")]
    Transition(#[from] TransitionError),
}

impl From<RequestEditError> for DomainError {
    fn from(err: RequestEditError) -> Self {
        match err {
            RequestEditError::Session(inner) => inner.into(),
            RequestEditError::Superseded => {
                DomainError::new(ErrorCode::TurnSuperseded, err.to_string())
            }
            RequestEditError::Transition(inner) => inner.into(),
        }
    }
}

/// Handler for edit requests.
pub struct RequestEditHandler {
    store: Arc<dyn ProjectStore>,
    sessions: Arc<SessionRegistry>,
}

impl RequestEditHandler {
    pub fn new(store: Arc<dyn ProjectStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub async fn handle(&self, cmd: RequestEditCommand) -> Result<TurnRecord, RequestEditError> {
        let slot = self.sessions.slot(cmd.project_id).await;
        let ticket = slot.ticket();
        let mut guard = slot.lock().await;
        if !slot.is_current(ticket) {
            return Err(RequestEditError::Superseded);
        }

        let session = resume(
            &mut guard,
            self.store.as_ref(),
            cmd.project_id,
            self.sessions.history_window(),
        )
        .await?;

        session.project.request_edit(cmd.step)?;

        let text = templates::edit_text(cmd.step, session.project.pending_target().as_deref());
        session
            .turns
            .push(ConversationTurn::assistant(text.clone(), Vec::new()));

        let mut warnings = Vec::new();
        if let Err(err) = self.store.save(&session.project).await {
            tracing::warn!(project_id = %cmd.project_id, error = %err, "Failed to save project");
            warnings.push(EngineWarning::PersistenceFailure(err.to_string()));
        }

        tracing::info!(
            project_id = %cmd.project_id,
            step = %cmd.step,
            revision = session.project.revision(),
            "Step reopened for editing"
        );

        Ok(TurnRecord {
            project_id: cmd.project_id,
            display_text: text,
            suggestions: Vec::new(),
            is_stage_complete: false,
            current_stage: session.project.stage(),
            current_step: session.project.step(),
            strategy: None,
            revision: session.project.revision(),
            warnings,
        })
    }
}
