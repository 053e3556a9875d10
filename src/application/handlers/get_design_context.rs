//! GetDesignContextHandler - Read-only view of a project's position and data.

use std::sync::Arc;

use crate::application::session::{resume, SessionError, SessionRegistry};
use crate::domain::design::DesignContext;
use crate::domain::foundation::ProjectId;
use crate::ports::ProjectStore;

/// Query for the current design context.
#[derive(Debug, Clone)]
pub struct GetDesignContextQuery {
    pub project_id: ProjectId,
}

/// Handler for design context queries.
///
/// Waits for any in-progress turn, so the view always reflects committed
/// state. The open refinement offer is never exposed.
pub struct GetDesignContextHandler {
    store: Arc<dyn ProjectStore>,
    sessions: Arc<SessionRegistry>,
}

impl GetDesignContextHandler {
    pub fn new(store: Arc<dyn ProjectStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub async fn handle(&self, query: GetDesignContextQuery) -> Result<DesignContext, SessionError> {
        let slot = self.sessions.slot(query.project_id).await;
        let mut guard = slot.lock().await;
        let session = resume(
            &mut guard,
            self.store.as_ref(),
            query.project_id,
            self.sessions.history_window(),
        )
        .await?;
        Ok(session.project.current_context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryProjectStore;
    use crate::domain::design::{Project, Stage, StepId};

    #[tokio::test]
    async fn returns_context_of_stored_project() {
        let store = InMemoryProjectStore::new();
        let project = Project::new(ProjectId::new());
        store.save(&project).await.unwrap();

        let handler =
            GetDesignContextHandler::new(Arc::new(store), Arc::new(SessionRegistry::new(12)));
        let context = handler
            .handle(GetDesignContextQuery {
                project_id: project.id(),
            })
            .await
            .unwrap();

        assert_eq!(context.project_id, project.id());
        assert_eq!(context.stage, Stage::Ideation);
        assert_eq!(context.step, StepId::BigIdea);
        assert_eq!(context.revision, 0);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let handler = GetDesignContextHandler::new(
            Arc::new(InMemoryProjectStore::new()),
            Arc::new(SessionRegistry::new(12)),
        );
        let err = handler
            .handle(GetDesignContextQuery {
                project_id: ProjectId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }
}
