//! ProcessUtteranceHandler - Runs one conversational turn end to end.
//!
//! classify → validate → select → ask the backend → vet its patch →
//! apply the outcome → record turns → save → presentation record.
//!
//! The backend call is the only suspension point while the session is
//! locked. A newer input for the same project supersedes the turn, which
//! then returns [`ProcessUtteranceError::Superseded`] without touching state.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::application::presentation::{EngineWarning, TurnRecord};
use crate::application::session::{resume, Session, SessionError, SessionRegistry};
use crate::domain::design::{ConversationTurn, Project, Stage, StepId, TransitionError};
use crate::domain::flow::templates::{self, OFFER_CHIPS};
use crate::domain::flow::{vet_patch, ClarifyReason, Strategy, StrategySelector, TurnAssessment};
use crate::domain::foundation::{DomainError, ErrorCode, ProjectId};
use crate::ports::{BackendReply, DesignBackend, ProjectStore, PromptContext};

/// Command to process one educator utterance.
#[derive(Debug, Clone)]
pub struct ProcessUtteranceCommand {
    pub project_id: ProjectId,
    pub utterance: String,
}

/// Errors that end a turn without a reply.
#[derive(Debug, Error)]
pub enum ProcessUtteranceError {
    #[error("Utterance is empty")]
    EmptyUtterance,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Turn was superseded by newer input")]
    Superseded,

    #[error("Transition rejected: {0}")]
    Transition(#[from] TransitionError),
}

impl From<ProcessUtteranceError> for DomainError {
    fn from(err: ProcessUtteranceError) -> Self {
        match err {
            ProcessUtteranceError::EmptyUtterance => {
                DomainError::new(ErrorCode::EmptyField, err.to_string())
            }
            ProcessUtteranceError::Session(inner) => inner.into(),
            ProcessUtteranceError::Superseded => {
                DomainError::new(ErrorCode::TurnSuperseded, err.to_string())
            }
            ProcessUtteranceError::Transition(inner) => inner.into(),
        }
    }
}

/// Handler for conversational turns.
pub struct ProcessUtteranceHandler {
    backend: Arc<dyn DesignBackend>,
    store: Arc<dyn ProjectStore>,
    sessions: Arc<SessionRegistry>,
    selector: StrategySelector,
    backend_timeout: Duration,
}

impl ProcessUtteranceHandler {
    pub fn new(
        backend: Arc<dyn DesignBackend>,
        store: Arc<dyn ProjectStore>,
        sessions: Arc<SessionRegistry>,
        selector: StrategySelector,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            sessions,
            selector,
            backend_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessUtteranceCommand,
    ) -> Result<TurnRecord, ProcessUtteranceError> {
        let utterance = cmd.utterance.trim();
        if utterance.is_empty() {
            return Err(ProcessUtteranceError::EmptyUtterance);
        }

        // 1. Claim the newest position and wait for the session
        let slot = self.sessions.slot(cmd.project_id).await;
        let ticket = slot.ticket();
        let mut guard = slot.lock().await;
        if !slot.is_current(ticket) {
            tracing::debug!(project_id = %cmd.project_id, "Turn superseded while queued");
            return Err(ProcessUtteranceError::Superseded);
        }

        let session = resume(
            &mut guard,
            self.store.as_ref(),
            cmd.project_id,
            self.sessions.history_window(),
        )
        .await?;

        if session.project.is_complete() {
            return Ok(completed_design_reply(session, utterance));
        }

        // 2. Classify, validate, select
        let prior_turn = session.last_assistant_turn().cloned();
        let prior_suggestions = prior_turn
            .as_ref()
            .map(|turn| turn.suggestions.clone())
            .unwrap_or_default();
        let assessment = self.selector.assess(
            &session.project,
            utterance,
            prior_turn.as_ref(),
            &prior_suggestions,
        );
        let outcome = assessment.strategy.to_outcome(&session.project);

        // 3. Preview the committed position so the backend can speak to it
        let mut preview = session.project.clone();
        preview.apply(&outcome)?;

        let context = self.prompt_context(session, &preview, &assessment, utterance);
        let mut warnings = Vec::new();

        // 4. Ask the backend, abandoning the turn if newer input arrives
        let mut reply = tokio::select! {
            biased;
            _ = slot.superseded(ticket) => {
                tracing::debug!(project_id = %cmd.project_id, "Turn superseded during backend call");
                return Err(ProcessUtteranceError::Superseded);
            }
            result = tokio::time::timeout(self.backend_timeout, self.backend.generate(&context)) => {
                match result {
                    Ok(Ok(reply)) => Some(reply),
                    Ok(Err(err)) => {
                        tracing::warn!(project_id = %cmd.project_id, error = %err, "Backend failed, using local text");
                        warnings.push(EngineWarning::BackendUnavailable(err.to_string()));
                        None
                    }
                    Err(_) => {
                        tracing::warn!(project_id = %cmd.project_id, timeout_ms = self.backend_timeout.as_millis() as u64, "Backend timed out, using local text");
                        warnings.push(EngineWarning::BackendUnavailable(format!(
                            "no reply within {}ms",
                            self.backend_timeout.as_millis()
                        )));
                        None
                    }
                }
            }
        };

        if !slot.is_current(ticket) {
            return Err(ProcessUtteranceError::Superseded);
        }

        // 5. Vet the backend patch against the committed project
        let mut patched = outcome.clone();
        if let Some(raw) = reply
            .as_ref()
            .and_then(|r| r.proposed_data_patch.as_ref())
            .filter(|p| !p.is_empty())
        {
            match vet_patch(&session.project, raw) {
                Ok(entries) => patched = outcome.clone().with_patch(entries),
                Err(rejection) => {
                    tracing::warn!(project_id = %cmd.project_id, reason = %rejection, "Discarding backend patch");
                    warnings.push(EngineWarning::InvalidPatchFromBackend(rejection.to_string()));
                    reply = None;
                }
            }
        }

        // 6. Commit
        let before = (session.project.stage(), session.project.step());
        if let Err(err) = session.project.apply(&patched) {
            if patched.patch.is_empty() {
                return Err(err.into());
            }
            tracing::warn!(project_id = %cmd.project_id, error = %err, "Backend patch failed to apply");
            warnings.push(EngineWarning::InvalidPatchFromBackend(err.to_string()));
            reply = None;
            session.project.apply(&outcome)?;
        }

        if (session.project.stage(), session.project.step()) != (preview.stage(), preview.step())
        {
            // The backend spoke to a position the patch moved past.
            reply = None;
        }
        if let Some(r) = reply.as_ref() {
            warnings.extend(check_hints(&session.project, before.0, r));
        }

        // 7. Compose the reply and record the exchange
        let composed = compose_reply(
            &assessment.strategy,
            before,
            &session.project,
            reply.as_ref(),
            self.selector.config().coaching_prompt_count,
        );

        session.turns.push(ConversationTurn::user(utterance));
        session.turns.push(ConversationTurn::assistant(
            composed.text.clone(),
            composed.suggestions.clone(),
        ));

        // 8. Persist before acknowledging
        if let Err(err) = self.store.save(&session.project).await {
            tracing::warn!(project_id = %cmd.project_id, error = %err, "Failed to save project");
            warnings.push(EngineWarning::PersistenceFailure(err.to_string()));
        }

        tracing::info!(
            project_id = %cmd.project_id,
            strategy = assessment.strategy.kind().as_str(),
            from_step = %before.1,
            to_step = %session.project.step(),
            revision = session.project.revision(),
            "Turn processed"
        );

        Ok(TurnRecord {
            project_id: cmd.project_id,
            display_text: composed.text,
            suggestions: composed.suggestions,
            is_stage_complete: composed.is_stage_complete,
            current_stage: session.project.stage(),
            current_step: session.project.step(),
            strategy: Some(assessment.strategy.kind()),
            revision: session.project.revision(),
            warnings,
        })
    }

    fn prompt_context(
        &self,
        session: &Session,
        preview: &Project,
        assessment: &TurnAssessment,
        utterance: &str,
    ) -> PromptContext {
        let project = &session.project;
        PromptContext {
            project_id: project.id(),
            stage: project.stage(),
            step: project.step(),
            strategy: assessment.strategy.kind(),
            directive: directive(&assessment.strategy, project, preview),
            data: preview.data().clone(),
            pending_target: project.pending_target(),
            proposed_value: assessment.classification.proposed_value.clone(),
            recent_turns: session.turns.to_vec(),
            user_utterance: utterance.to_string(),
            requested_suggestions: assessment.requested_suggestions(self.selector.config()),
        }
    }
}

/// Reply for input that arrives after the design is finished.
fn completed_design_reply(session: &mut Session, utterance: &str) -> TurnRecord {
    let text = templates::design_complete_text(session.project.data());
    session.turns.push(ConversationTurn::user(utterance));
    session
        .turns
        .push(ConversationTurn::assistant(text.clone(), Vec::new()));

    TurnRecord {
        project_id: session.project.id(),
        display_text: text,
        suggestions: Vec::new(),
        is_stage_complete: true,
        current_stage: session.project.stage(),
        current_step: session.project.step(),
        strategy: None,
        revision: session.project.revision(),
        warnings: Vec::new(),
    }
}

/// Instruction telling the backend what this reply must do.
fn directive(strategy: &Strategy, project: &Project, preview: &Project) -> String {
    let step = project.step().label();
    let next_position = || match preview.stage() {
        Stage::Complete => "The whole design is now complete. Congratulate the educator.".to_string(),
        stage if stage != project.stage() => format!(
            "The {} stage is finished. Introduce the {} stage and its first step, the {}.",
            project.stage().label(),
            stage.label(),
            preview.step().label()
        ),
        _ => match preview.pending_target() {
            Some(target) => format!(
                "Introduce the next step: the {} for \"{}\".",
                preview.step().label(),
                target
            ),
            None => format!("Introduce the next step: the {}.", preview.step().label()),
        },
    };

    match strategy {
        Strategy::CompleteStage => next_position(),
        Strategy::OfferRefinement { value } => format!(
            "The educator proposed \"{value}\" as the {step}. In one or two sentences, say what makes it strong. Do not ask whether to continue; the app adds that question."
        ),
        Strategy::AcceptAndAdvance { value } => format!(
            "The educator locked in \"{value}\" as the {step}. Acknowledge it briefly. {}",
            next_position()
        ),
        Strategy::RejectAndCoach { reason, .. } => format!(
            "The answer does not fit the {step}: {reason} Coach the educator kindly toward a better answer."
        ),
        Strategy::StayAndClarify(ClarifyReason::WhatIf { concept }) => match concept {
            Some(concept) => format!(
                "The educator picked a what-if prompt about \"{concept}\". Ask them to restate it in their own words as the {step}. Do not write it for them."
            ),
            None => format!(
                "The educator picked a what-if prompt. Ask them to restate it in their own words as the {step}. Do not write it for them."
            ),
        },
        Strategy::StayAndClarify(ClarifyReason::HelpRequest) => {
            format!("The educator asked for help with the {step}. Offer encouraging starting points.")
        }
        Strategy::StayAndClarify(ClarifyReason::HelpLoop) => format!(
            "The educator has asked for help several times in a row. Encourage them to write a rough first draft of the {step} now."
        ),
        Strategy::StayAndClarify(ClarifyReason::RefinementRequested) => {
            let offered = project
                .open_offer()
                .map(|offer| offer.value.as_str())
                .unwrap_or_default();
            format!(
                "The educator wants to refine \"{offered}\" as the {step}. Ask one focused question that would make it more specific."
            )
        }
        Strategy::StayAndClarify(ClarifyReason::NeedsElaboration) => format!(
            "The reply was too short or unclear to use as the {step}. Ask the educator to say more."
        ),
    }
}

/// Cross-checks the backend's position hints against the committed project.
fn check_hints(project: &Project, stage_before: Stage, reply: &BackendReply) -> Vec<EngineWarning> {
    let mut warnings = Vec::new();

    if let Some(hint) = reply.proposed_next_step.as_deref() {
        match hint.parse::<StepId>() {
            Ok(step) if step == project.step() => {}
            _ => {
                tracing::warn!(project_id = %project.id(), hint, actual = %project.step(), "Ignoring backend step hint");
                warnings.push(EngineWarning::IgnoredBackendHint(format!(
                    "proposed next step '{}' but the project is at '{}'",
                    hint,
                    project.step()
                )));
            }
        }
    }

    if let Some(claimed) = reply.stage_complete {
        let actual = project.stage() != stage_before;
        if claimed != actual {
            tracing::warn!(project_id = %project.id(), claimed, actual, "Ignoring backend stage-complete flag");
            warnings.push(EngineWarning::IgnoredBackendHint(format!(
                "stage_complete was {} but the stage {} change",
                claimed,
                if actual { "did" } else { "did not" }
            )));
        }
    }

    warnings
}

struct ComposedReply {
    text: String,
    suggestions: Vec<String>,
    is_stage_complete: bool,
}

/// Combines engine-owned text with the backend reply, or local fallbacks.
fn compose_reply(
    strategy: &Strategy,
    before: (Stage, StepId),
    project: &Project,
    reply: Option<&BackendReply>,
    coaching_count: usize,
) -> ComposedReply {
    let (stage_before, step_before) = before;
    let backend_text = reply
        .map(|r| r.display_text.trim())
        .filter(|text| !text.is_empty());
    let backend_suggestions = reply
        .and_then(|r| r.suggestions.as_ref())
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().take(coaching_count).cloned().collect::<Vec<_>>());
    let coaching = || {
        templates::coaching_prompts_for_step(step_before)
            .iter()
            .take(coaching_count)
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
    };

    if project.stage() != stage_before {
        let mut parts = Vec::new();
        if let Strategy::AcceptAndAdvance { value } = strategy {
            parts.push(templates::accepted_text(step_before, value));
        }
        parts.push(templates::stage_complete_text(
            stage_before,
            project.data(),
            project.stage(),
        ));
        return ComposedReply {
            text: parts.join("\n\n"),
            suggestions: Vec::new(),
            is_stage_complete: true,
        };
    }

    let (text, suggestions) = match strategy {
        Strategy::OfferRefinement { value } => {
            let offer = templates::offer_text(step_before, value);
            let text = match backend_text {
                Some(comment) => format!("{comment}\n\n{offer}"),
                None => offer,
            };
            (text, OFFER_CHIPS.iter().map(|c| c.to_string()).collect())
        }
        Strategy::AcceptAndAdvance { value } => {
            let next = backend_text.map(str::to_string).unwrap_or_else(|| {
                templates::opening_message_for_step(
                    project.step(),
                    project.pending_target().as_deref(),
                )
            });
            (
                format!("{}\n\n{}", templates::accepted_text(step_before, value), next),
                backend_suggestions.unwrap_or_default(),
            )
        }
        Strategy::RejectAndCoach { reason, .. } => {
            let lead = templates::rejection_text(reason);
            let text = match backend_text {
                Some(coaching_text) => format!("{lead}\n\n{coaching_text}"),
                None => lead,
            };
            (text, backend_suggestions.unwrap_or_else(coaching))
        }
        Strategy::StayAndClarify(ClarifyReason::WhatIf { concept }) => (
            backend_text
                .map(str::to_string)
                .unwrap_or_else(|| templates::what_if_text(step_before, concept.as_deref())),
            Vec::new(),
        ),
        Strategy::StayAndClarify(ClarifyReason::HelpRequest) => (
            backend_text
                .map(str::to_string)
                .unwrap_or_else(|| templates::help_text(step_before)),
            backend_suggestions.unwrap_or_else(coaching),
        ),
        Strategy::StayAndClarify(ClarifyReason::HelpLoop) => {
            (templates::help_loop_nudge(step_before), Vec::new())
        }
        Strategy::StayAndClarify(ClarifyReason::RefinementRequested) => {
            let text = backend_text.map(str::to_string).unwrap_or_else(|| {
                let offered = project
                    .open_offer()
                    .map(|offer| offer.value.as_str())
                    .unwrap_or_default();
                templates::refinement_text(step_before, offered)
            });
            (text, backend_suggestions.unwrap_or_else(coaching))
        }
        Strategy::StayAndClarify(ClarifyReason::NeedsElaboration) => (
            backend_text
                .map(str::to_string)
                .unwrap_or_else(|| templates::elaboration_text(step_before)),
            backend_suggestions.unwrap_or_default(),
        ),
        // Stage completion always changes the stage and returns above.
        Strategy::CompleteStage => (
            templates::opening_message_for_step(project.step(), None),
            Vec::new(),
        ),
    };

    ComposedReply {
        text,
        suggestions,
        is_stage_complete: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryProjectStore;
    use crate::domain::design::{
        Mutation, SlotValue, StrategyKind, StrategyOutcome, StructuredData, WriteMode,
    };
    use crate::domain::flow::SelectorConfig;
    use crate::ports::{BackendError, StoreError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend returning queued results, then empty replies.
    struct StubBackend {
        replies: Mutex<VecDeque<Result<BackendReply, BackendError>>>,
        contexts: Mutex<Vec<PromptContext>>,
        delay: Duration,
    }

    impl StubBackend {
        fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                contexts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn with_reply(self, reply: Result<BackendReply, BackendError>) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn contexts(&self) -> Vec<PromptContext> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DesignBackend for StubBackend {
        async fn generate(&self, context: &PromptContext) -> Result<BackendReply, BackendError> {
            self.contexts.lock().unwrap().push(context.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::InvalidReply("empty".to_string())))
        }
    }

    /// Store whose saves always fail.
    struct FailingStore {
        inner: InMemoryProjectStore,
    }

    #[async_trait]
    impl ProjectStore for FailingStore {
        async fn load(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
            self.inner.load(id).await
        }

        async fn save(&self, _project: &Project) -> Result<(), StoreError> {
            Err(StoreError::IoError("disk full".to_string()))
        }

        async fn exists(&self, id: ProjectId) -> Result<bool, StoreError> {
            self.inner.exists(id).await
        }

        async fn delete(&self, id: ProjectId) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }
    }

    struct Fixture {
        handler: ProcessUtteranceHandler,
        backend: Arc<StubBackend>,
        store: InMemoryProjectStore,
        project_id: ProjectId,
    }

    async fn fixture_with(backend: StubBackend, project: Project) -> Fixture {
        let store = InMemoryProjectStore::new();
        store.save(&project).await.unwrap();
        let backend = Arc::new(backend);
        let handler = ProcessUtteranceHandler::new(
            backend.clone(),
            Arc::new(store.clone()),
            Arc::new(SessionRegistry::new(12)),
            StrategySelector::new(SelectorConfig::default()),
            Duration::from_millis(200),
        );
        Fixture {
            handler,
            backend,
            store,
            project_id: project.id(),
        }
    }

    fn project_at(step: StepId) -> Project {
        let mut data = StructuredData::default();
        for earlier in StepId::all().into_iter().take_while(|s| *s != step) {
            let value = match earlier {
                StepId::EssentialQuestion => "How might we protect our creek?",
                StepId::Phases => "Investigate",
                StepId::Milestones => "Research Report",
                StepId::Assessment => "Rubric",
                _ => "A sufficiently long placeholder answer",
            };
            data.write(earlier, value, WriteMode::Fill).unwrap();
        }
        Project::reconstitute(ProjectId::new(), step.stage(), step, data, 0)
    }

    fn say(project_id: ProjectId, utterance: &str) -> ProcessUtteranceCommand {
        ProcessUtteranceCommand {
            project_id,
            utterance: utterance.to_string(),
        }
    }

    #[tokio::test]
    async fn offer_uses_engine_text_and_chips() {
        let f = fixture_with(StubBackend::new(), Project::new(ProjectId::new())).await;

        let record = f
            .handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();

        assert_eq!(record.strategy, Some(StrategyKind::OfferRefinement));
        assert!(record
            .display_text
            .contains("move forward with \"Water shapes how communities grow\""));
        assert_eq!(record.suggestions, vec!["Keep and continue", "Make it more specific"]);
        assert_eq!(record.current_step, StepId::BigIdea);
        assert!(matches!(
            record.warnings.as_slice(),
            [EngineWarning::BackendUnavailable(_)]
        ));
    }

    #[tokio::test]
    async fn confirmation_commits_and_persists() {
        let f = fixture_with(StubBackend::new(), Project::new(ProjectId::new())).await;

        f.handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();
        let record = f.handler.handle(say(f.project_id, "sounds good")).await.unwrap();

        assert_eq!(record.strategy, Some(StrategyKind::AcceptAndAdvance));
        assert_eq!(record.current_step, StepId::EssentialQuestion);
        assert_eq!(record.revision, 2);

        let saved = f.store.load(f.project_id).await.unwrap().unwrap();
        assert_eq!(
            saved.data().ideation.big_idea.as_deref(),
            Some("Water shapes how communities grow")
        );
    }

    #[tokio::test]
    async fn backend_text_leads_offer() {
        let backend = StubBackend::new().with_reply(Ok(BackendReply::text("A rich theme.")));
        let f = fixture_with(backend, Project::new(ProjectId::new())).await;

        let record = f
            .handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();

        assert!(record.display_text.starts_with("A rich theme."));
        assert!(record.display_text.contains("refine it further"));
        assert!(record.warnings.is_empty());

        let context = &f.backend.contexts()[0];
        assert_eq!(context.strategy, StrategyKind::OfferRefinement);
        assert_eq!(context.step, StepId::BigIdea);
    }

    #[tokio::test]
    async fn help_request_falls_back_to_local_coaching() {
        let f = fixture_with(StubBackend::new(), project_at(StepId::Assessment)).await;

        let record = f
            .handler
            .handle(say(f.project_id, "not sure help me"))
            .await
            .unwrap();

        assert_eq!(record.strategy, Some(StrategyKind::StayAndClarify));
        assert_eq!(record.suggestions.len(), 3);
        assert!(record
            .suggestions
            .iter()
            .all(|s| s.to_lowercase().starts_with("what if")));
        assert_eq!(f.backend.contexts()[0].requested_suggestions, 3);
    }

    #[tokio::test]
    async fn invalid_patch_is_discarded_with_warning() {
        let mut reply = BackendReply::text("Great, and here is a question too.");
        let mut patch = serde_json::Map::new();
        patch.insert("milestones".to_string(), serde_json::json!("Report"));
        reply.proposed_data_patch = Some(patch);

        let f = fixture_with(StubBackend::new().with_reply(Ok(reply)), Project::new(ProjectId::new())).await;
        let record = f
            .handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();

        assert!(matches!(
            record.warnings.as_slice(),
            [EngineWarning::InvalidPatchFromBackend(_)]
        ));
        assert!(!record.display_text.contains("here is a question"));
        let saved = f.store.load(f.project_id).await.unwrap().unwrap();
        assert!(saved.data().deliverables.milestones.is_empty());
    }

    #[tokio::test]
    async fn valid_patch_fills_later_empty_slot() {
        let mut reply = BackendReply::text("Nice.");
        let mut patch = serde_json::Map::new();
        patch.insert(
            "challenge".to_string(),
            serde_json::json!("Design a plan to restore the local creek"),
        );
        reply.proposed_data_patch = Some(patch);

        let f = fixture_with(StubBackend::new().with_reply(Ok(reply)), Project::new(ProjectId::new())).await;
        let record = f
            .handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();

        assert!(record.warnings.is_empty());
        let saved = f.store.load(f.project_id).await.unwrap().unwrap();
        assert_eq!(
            saved.data().ideation.challenge.as_deref(),
            Some("Design a plan to restore the local creek")
        );
        assert!(saved.data().ideation.big_idea.is_none());
    }

    #[tokio::test]
    async fn mismatched_step_hint_is_ignored() {
        let mut reply = BackendReply::text("Good.");
        reply.proposed_next_step = Some("assessment".to_string());

        let f = fixture_with(StubBackend::new().with_reply(Ok(reply)), Project::new(ProjectId::new())).await;
        let record = f
            .handler
            .handle(say(f.project_id, "Water shapes how communities grow"))
            .await
            .unwrap();

        assert_eq!(record.current_step, StepId::BigIdea);
        assert!(matches!(
            record.warnings.as_slice(),
            [EngineWarning::IgnoredBackendHint(_)]
        ));
    }

    #[tokio::test]
    async fn backend_timeout_uses_local_text() {
        let backend = StubBackend::new()
            .with_reply(Ok(BackendReply::text("too late")))
            .with_delay(Duration::from_secs(5));
        let f = fixture_with(backend, Project::new(ProjectId::new())).await;

        let record = f.handler.handle(say(f.project_id, "hmm")).await.unwrap();
        assert!(!record.display_text.contains("too late"));
        assert!(matches!(
            record.warnings.as_slice(),
            [EngineWarning::BackendUnavailable(m)] if m.contains("no reply")
        ));
    }

    #[tokio::test]
    async fn persistence_failure_is_a_warning() {
        let store = FailingStore {
            inner: InMemoryProjectStore::new(),
        };
        let project = Project::new(ProjectId::new());
        store.inner.save(&project).await.unwrap();

        let handler = ProcessUtteranceHandler::new(
            Arc::new(StubBackend::new()),
            Arc::new(store),
            Arc::new(SessionRegistry::new(12)),
            StrategySelector::default(),
            Duration::from_millis(200),
        );

        let record = handler
            .handle(say(project.id(), "Water shapes how communities grow"))
            .await
            .unwrap();
        assert_eq!(record.strategy, Some(StrategyKind::OfferRefinement));
        assert!(record
            .warnings
            .iter()
            .any(|w| matches!(w, EngineWarning::PersistenceFailure(m) if m.contains("disk full"))));
    }

    #[tokio::test]
    async fn last_step_completion_reports_stage_complete() {
        let f = fixture_with(StubBackend::new(), project_at(StepId::Challenge)).await;

        f.handler
            .handle(say(f.project_id, "Students design a plan to restore the creek"))
            .await
            .unwrap();
        let record = f.handler.handle(say(f.project_id, "yes")).await.unwrap();

        assert!(record.is_stage_complete);
        assert_eq!(record.current_stage, Stage::Journey);
        assert_eq!(record.current_step, StepId::Phases);
        assert!(record.display_text.contains("stage is complete"));
    }

    #[tokio::test]
    async fn complete_design_answers_without_transition() {
        let mut project = project_at(StepId::Assessment);
        project
            .apply(&StrategyOutcome::new(
                0,
                StrategyKind::OfferRefinement,
                Mutation::OfferRefinement(SlotValue::new(StepId::Assessment, "Rubric")),
            ))
            .unwrap();
        project
            .apply(&StrategyOutcome::new(
                1,
                StrategyKind::AcceptAndAdvance,
                Mutation::CommitOffer(SlotValue::new(StepId::Assessment, "Rubric")),
            ))
            .unwrap();
        assert!(project.is_complete());

        let f = fixture_with(StubBackend::new(), project).await;
        let record = f.handler.handle(say(f.project_id, "one more idea")).await.unwrap();

        assert!(record.strategy.is_none());
        assert_eq!(record.revision, 2);
        assert!(record.display_text.contains("already complete"));
        assert!(f.backend.contexts().is_empty());
    }

    #[tokio::test]
    async fn newer_utterance_supersedes_inflight_turn() {
        let backend = StubBackend::new()
            .with_reply(Ok(BackendReply::text("slow")))
            .with_delay(Duration::from_millis(100));
        let f = fixture_with(backend, Project::new(ProjectId::new())).await;
        let handler = Arc::new(f.handler);

        let first = {
            let handler = Arc::clone(&handler);
            let id = f.project_id;
            tokio::spawn(async move {
                handler
                    .handle(say(id, "Water shapes how communities grow"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = handler.handle(say(f.project_id, "help")).await.unwrap();

        let first = first.await.unwrap();
        assert!(matches!(first, Err(ProcessUtteranceError::Superseded)));
        assert_eq!(second.strategy, Some(StrategyKind::StayAndClarify));
        assert_eq!(second.revision, 1);

        let saved = f.store.load(f.project_id).await.unwrap().unwrap();
        assert!(saved.open_offer().is_none());
    }

    #[tokio::test]
    async fn unknown_project_is_session_error() {
        let f = fixture_with(StubBackend::new(), Project::new(ProjectId::new())).await;
        let err = f
            .handler
            .handle(say(ProjectId::new(), "hello there"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessUtteranceError::Session(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_utterance_is_rejected() {
        let f = fixture_with(StubBackend::new(), Project::new(ProjectId::new())).await;
        let err = f.handler.handle(say(f.project_id, "   ")).await.unwrap_err();
        assert!(matches!(err, ProcessUtteranceError::EmptyUtterance));

        let domain: DomainError = err.into();
        assert_eq!(domain.code, ErrorCode::EmptyField);
    }
}
