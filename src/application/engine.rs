//! DesignFlowEngine - Facade over the design handlers.
//!
//! Owns the session registry and wires one backend and one store into every
//! handler, so callers only deal with project ids, utterances, and records.

use std::sync::Arc;

use thiserror::Error;

use super::handlers::{
    GetDesignContextHandler, GetDesignContextQuery, ProcessUtteranceCommand,
    ProcessUtteranceError, ProcessUtteranceHandler, RequestEditCommand, RequestEditError,
    RequestEditHandler, StartDesignCommand, StartDesignHandler, StartDesignResult,
};
use super::presentation::TurnRecord;
use super::session::{SessionError, SessionRegistry};
use crate::adapters::ai::{AnthropicConfig, AnthropicProvider, CompletionBackend, MockAIProvider};
use crate::adapters::storage::{FileProjectStore, InMemoryProjectStore};
use crate::config::{AiProvider, AppConfig, EngineConfig, StorageBackend, ValidationError};
use crate::domain::design::{DesignContext, StepId};
use crate::domain::flow::StrategySelector;
use crate::domain::foundation::ProjectId;
use crate::ports::{AIError, DesignBackend, ProjectStore};

/// Errors raised while assembling an engine from configuration.
#[derive(Debug, Error)]
pub enum EngineBuildError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to create AI provider: {0}")]
    Provider(#[from] AIError),
}

/// Conversational flow engine for PBL unit design.
pub struct DesignFlowEngine {
    sessions: Arc<SessionRegistry>,
    start: StartDesignHandler,
    process: ProcessUtteranceHandler,
    edit: RequestEditHandler,
    context: GetDesignContextHandler,
}

impl DesignFlowEngine {
    pub fn new(
        backend: Arc<dyn DesignBackend>,
        store: Arc<dyn ProjectStore>,
        config: &EngineConfig,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.history_window));

        Self {
            start: StartDesignHandler::new(Arc::clone(&store), Arc::clone(&sessions)),
            process: ProcessUtteranceHandler::new(
                backend,
                Arc::clone(&store),
                Arc::clone(&sessions),
                StrategySelector::new(config.selector_config()),
                config.backend_timeout(),
            ),
            edit: RequestEditHandler::new(Arc::clone(&store), Arc::clone(&sessions)),
            context: GetDesignContextHandler::new(store, Arc::clone(&sessions)),
            sessions,
        }
    }

    /// Builds an engine from application configuration.
    ///
    /// Without an Anthropic key the engine runs offline: every reply comes
    /// from local templates.
    ///
    /// # Errors
    ///
    /// `Config` if validation fails, `Provider` if the HTTP client cannot be
    /// created.
    pub fn from_config(config: &AppConfig) -> Result<Self, EngineBuildError> {
        config.engine.validate()?;
        config.ai.validate()?;
        config.storage.validate()?;

        let backend: Arc<dyn DesignBackend> = match (&config.ai.provider, &config.ai.anthropic_api_key) {
            (AiProvider::Anthropic, Some(key)) => {
                let provider_config = AnthropicConfig::new(key.clone())
                    .with_model(config.ai.model.clone())
                    .with_timeout(config.ai.timeout())
                    .with_max_retries(config.ai.max_retries);
                Arc::new(CompletionBackend::new(AnthropicProvider::new(provider_config)?))
            }
            _ => Arc::new(CompletionBackend::new(MockAIProvider::offline())),
        };

        let store: Arc<dyn ProjectStore> = match config.storage.backend {
            StorageBackend::File => Arc::new(FileProjectStore::new(&config.storage.data_dir)),
            StorageBackend::Memory => Arc::new(InMemoryProjectStore::new()),
        };

        tracing::info!(
            provider = ?config.ai.provider,
            storage = ?config.storage.backend,
            help_loop_threshold = config.engine.help_loop_threshold,
            "Design flow engine configured"
        );

        Ok(Self::new(backend, store, &config.engine))
    }

    /// Opens a new design, or resumes `project_id` if it is stored.
    pub async fn start_design(
        &self,
        project_id: Option<ProjectId>,
    ) -> Result<StartDesignResult, SessionError> {
        self.start.handle(StartDesignCommand { project_id }).await
    }

    /// Runs one educator utterance through the flow.
    pub async fn process_utterance(
        &self,
        project_id: ProjectId,
        utterance: impl Into<String>,
    ) -> Result<TurnRecord, ProcessUtteranceError> {
        self.process
            .handle(ProcessUtteranceCommand {
                project_id,
                utterance: utterance.into(),
            })
            .await
    }

    /// Reopens an earlier step.
    pub async fn request_edit(
        &self,
        project_id: ProjectId,
        step: StepId,
    ) -> Result<TurnRecord, RequestEditError> {
        self.edit.handle(RequestEditCommand { project_id, step }).await
    }

    /// Committed position and data of a project.
    pub async fn design_context(&self, project_id: ProjectId) -> Result<DesignContext, SessionError> {
        self.context.handle(GetDesignContextQuery { project_id }).await
    }

    /// Number of projects with a live session.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }
}
