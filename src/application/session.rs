//! Live design sessions.
//!
//! Each project gets one [`SessionSlot`]. The slot serializes turns through
//! an async mutex and tracks a generation counter so that a newer input can
//! supersede a turn that is still waiting on the backend (last write wins).

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex, MutexGuard, RwLock};

use crate::domain::design::{ConversationTurn, Project, TurnWindow};
use crate::domain::foundation::{DomainError, ErrorCode, ProjectId};
use crate::ports::{ProjectStore, StoreError};

/// Errors raised while resolving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No design project with id {0}")]
    NotFound(ProjectId),

    #[error("Failed to load project: {0}")]
    Store(#[from] StoreError),
}

impl From<SessionError> for DomainError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::NotFound(id) => DomainError::new(ErrorCode::ProjectNotFound, err.to_string())
                .with_detail("project_id", id.to_string()),
            SessionError::Store(_) => DomainError::new(ErrorCode::PersistenceFailure, err.to_string()),
        }
    }
}

/// In-memory state of one design conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub project: Project,
    pub turns: TurnWindow,
}

impl Session {
    pub fn new(project: Project, history_window: usize) -> Self {
        Self {
            project,
            turns: TurnWindow::new(history_window),
        }
    }

    /// The most recent assistant turn, if any.
    pub fn last_assistant_turn(&self) -> Option<&ConversationTurn> {
        self.turns.last_assistant()
    }
}

/// Position in a slot's input sequence. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Per-project serialization point.
#[derive(Debug)]
pub struct SessionSlot {
    generation: watch::Sender<u64>,
    session: Mutex<Option<Session>>,
}

impl SessionSlot {
    fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            generation,
            session: Mutex::new(None),
        }
    }

    /// Registers a new input, superseding every earlier ticket.
    pub fn ticket(&self) -> Ticket {
        let mut issued = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            issued = *generation;
        });
        Ticket(issued)
    }

    /// True while no newer input has arrived.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        *self.generation.borrow() == ticket.0
    }

    /// Resolves once a newer ticket has been issued.
    pub async fn superseded(&self, ticket: Ticket) {
        let mut rx = self.generation.subscribe();
        if rx.wait_for(|generation| *generation != ticket.0).await.is_err() {
            // The sender lives as long as the slot, so this never resolves.
            std::future::pending::<()>().await;
        }
    }

    /// Waits for exclusive access to the session.
    pub async fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().await
    }
}

/// Loads the session into `guard` from `store` if it is not live yet.
///
/// # Errors
///
/// `NotFound` if the store has no such project, `Store` if loading failed.
pub async fn resume<'a>(
    guard: &'a mut Option<Session>,
    store: &dyn ProjectStore,
    project_id: ProjectId,
    history_window: usize,
) -> Result<&'a mut Session, SessionError> {
    if guard.is_none() {
        let project = store
            .load(project_id)
            .await?
            .ok_or(SessionError::NotFound(project_id))?;
        tracing::debug!(project_id = %project_id, revision = project.revision(), "Session resumed from store");
        *guard = Some(Session::new(project, history_window));
    }
    guard.as_mut().ok_or(SessionError::NotFound(project_id))
}

/// Registry of live sessions, one slot per project.
#[derive(Debug)]
pub struct SessionRegistry {
    slots: RwLock<HashMap<ProjectId, Arc<SessionSlot>>>,
    history_window: usize,
}

impl SessionRegistry {
    pub fn new(history_window: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            history_window: history_window.max(1),
        }
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Returns the slot for a project, creating an empty one on first use.
    pub async fn slot(&self, project_id: ProjectId) -> Arc<SessionSlot> {
        if let Some(slot) = self.slots.read().await.get(&project_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(project_id)
                .or_insert_with(|| Arc::new(SessionSlot::new())),
        )
    }

    /// Number of projects with a slot.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
