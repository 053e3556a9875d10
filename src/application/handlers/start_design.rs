//! StartDesignHandler - Opens a new design project or resumes a saved one.

use std::sync::Arc;

use crate::application::presentation::{EngineWarning, TurnRecord};
use crate::application::session::{Session, SessionError, SessionRegistry};
use crate::domain::design::{ConversationTurn, Project};
use crate::domain::flow::templates::{self, OFFER_CHIPS};
use crate::domain::foundation::ProjectId;
use crate::ports::ProjectStore;

/// Command to start or resume a design.
#[derive(Debug, Clone, Default)]
pub struct StartDesignCommand {
    /// Project to resume. A fresh id is generated when absent, and an
    /// unknown id starts a new project under that id.
    pub project_id: Option<ProjectId>,
}

/// Result of starting a design.
#[derive(Debug, Clone)]
pub struct StartDesignResult {
    pub record: TurnRecord,
    pub resumed: bool,
}

/// Handler for starting designs.
pub struct StartDesignHandler {
    store: Arc<dyn ProjectStore>,
    sessions: Arc<SessionRegistry>,
}

impl StartDesignHandler {
    pub fn new(store: Arc<dyn ProjectStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub async fn handle(&self, cmd: StartDesignCommand) -> Result<StartDesignResult, SessionError> {
        let project_id = cmd.project_id.unwrap_or_default();
        let slot = self.sessions.slot(project_id).await;
        let mut guard = slot.lock().await;
        let mut warnings = Vec::new();

        // 1. Reuse the live session, else the stored project, else a new one
        let (session, resumed) = match guard.take() {
            Some(session) => (session, true),
            None => match self.store.load(project_id).await? {
                Some(project) => (Session::new(project, self.sessions.history_window()), true),
                None => {
                    let project = Project::new(project_id);
                    if let Err(err) = self.store.save(&project).await {
                        tracing::warn!(project_id = %project_id, error = %err, "Failed to save new project");
                        warnings.push(EngineWarning::PersistenceFailure(err.to_string()));
                    }
                    (Session::new(project, self.sessions.history_window()), false)
                }
            },
        };
        let session = guard.insert(session);

        // 2. Greet at the current position
        let (text, suggestions) = opening(&session.project, resumed);
        session
            .turns
            .push(ConversationTurn::assistant(text.clone(), suggestions.clone()));

        tracing::info!(
            project_id = %project_id,
            resumed,
            stage = %session.project.stage(),
            step = %session.project.step(),
            "Design session started"
        );

        Ok(StartDesignResult {
            record: TurnRecord {
                project_id,
                display_text: text,
                suggestions,
                is_stage_complete: session.project.is_complete(),
                current_stage: session.project.stage(),
                current_step: session.project.step(),
                strategy: None,
                revision: session.project.revision(),
                warnings,
            },
            resumed,
        })
    }
}

fn opening(project: &Project, resumed: bool) -> (String, Vec<String>) {
    if project.is_complete() {
        return (templates::design_complete_text(project.data()), Vec::new());
    }

    if let Some(offer) = project.open_offer() {
        return (
            format!(
                "Welcome back. {}",
                templates::offer_text(offer.step, &offer.value)
            ),
            OFFER_CHIPS.iter().map(|c| c.to_string()).collect(),
        );
    }

    let target = project.pending_target();
    let text = if project.editing().is_some() {
        templates::edit_text(project.step(), target.as_deref())
    } else {
        templates::opening_message_for_step(project.step(), target.as_deref())
    };

    if resumed && project.revision() > 0 {
        (format!("Welcome back. {}", text), Vec::new())
    } else {
        (text, Vec::new())
    }
}
