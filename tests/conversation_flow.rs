//! Integration tests for the conversational design flow.
//!
//! These tests drive the public engine end to end:
//! 1. The mock provider answers through the real completion backend
//! 2. The engine classifies, validates, and applies each turn
//! 3. Projects persist through the in-memory or file store
//!
//! No network access is needed.

use std::sync::Arc;
use std::time::Duration;

use pbl_flow::adapters::ai::{CompletionBackend, MockAIProvider, MockError};
use pbl_flow::adapters::storage::{FileProjectStore, InMemoryProjectStore};
use pbl_flow::application::{DesignFlowEngine, EngineWarning, ProcessUtteranceError};
use pbl_flow::config::EngineConfig;
use pbl_flow::domain::design::{Project, StepId, StrategyKind, StructuredData, WriteMode};
use pbl_flow::domain::foundation::ProjectId;
use pbl_flow::ports::ProjectStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn engine_with(provider: MockAIProvider, store: Arc<dyn ProjectStore>) -> DesignFlowEngine {
    DesignFlowEngine::new(
        Arc::new(CompletionBackend::new(provider)),
        store,
        &EngineConfig::default(),
    )
}

/// A project positioned at `step` with every earlier slot filled.
fn project_at(step: StepId) -> Project {
    let mut data = StructuredData::default();
    for earlier in StepId::all().into_iter().take_while(|s| *s != step) {
        let value = match earlier {
            StepId::BigIdea => "Water shapes how communities grow",
            StepId::EssentialQuestion => "How might we protect our creek?",
            StepId::Challenge => "Design a plan to keep the local creek clean",
            StepId::Phases => "Investigate",
            StepId::Activities => "Interview residents who live along the creek",
            StepId::Resources => "County water quality reports",
            _ => "Research Report",
        };
        data.write(earlier, value, WriteMode::Fill).unwrap();
    }
    Project::reconstitute(ProjectId::new(), step.stage(), step, data, 0)
}

async fn seeded(step: StepId) -> (InMemoryProjectStore, ProjectId) {
    let store = InMemoryProjectStore::new();
    let project = project_at(step);
    store.save(&project).await.unwrap();
    (store, project.id())
}

// =============================================================================
// Milestone and assessment scenarios
// =============================================================================

#[tokio::test]
async fn suggestion_pick_is_offered_then_committed() {
    let (store, id) = seeded(StepId::Milestones).await;
    let provider = MockAIProvider::offline().with_response(
        r#"{"displayText": "Here are two directions.", "suggestions": ["Research Report", "what if you called it a Policy Brief?"]}"#,
    );
    let engine = engine_with(provider, Arc::new(store.clone()));
    engine.start_design(Some(id)).await.unwrap();

    let help = engine.process_utterance(id, "not sure help me").await.unwrap();
    assert_eq!(
        help.suggestions,
        vec!["Research Report", "what if you called it a Policy Brief?"]
    );

    let offer = engine.process_utterance(id, "Research Report").await.unwrap();
    assert_eq!(offer.strategy, Some(StrategyKind::OfferRefinement));
    assert!(offer.display_text.contains("\"Research Report\""));
    assert_eq!(offer.current_step, StepId::Milestones);

    let accepted = engine.process_utterance(id, "sounds good").await.unwrap();
    assert_eq!(accepted.strategy, Some(StrategyKind::AcceptAndAdvance));
    assert_eq!(accepted.current_step, StepId::Descriptions);

    let saved = store.load(id).await.unwrap().unwrap();
    let titles: Vec<&str> = saved
        .data()
        .deliverables
        .milestones
        .iter()
        .map(|m| m.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Research Report"]);
}

#[tokio::test]
async fn activity_phrasing_is_coached_at_milestones() {
    let (store, id) = seeded(StepId::Milestones).await;
    let engine = engine_with(MockAIProvider::offline(), Arc::new(store.clone()));

    let record = engine
        .process_utterance(id, "students will research the topic")
        .await
        .unwrap();

    assert_eq!(record.strategy, Some(StrategyKind::RejectAndCoach));
    assert!(record.display_text.contains("activity"));
    assert!(record.display_text.contains("deliverable"));
    assert_eq!(record.current_step, StepId::Milestones);
    assert!(!record.suggestions.is_empty());

    let saved = store.load(id).await.unwrap().unwrap();
    assert!(saved.data().deliverables.milestones.is_empty());
}

#[tokio::test]
async fn help_at_assessment_gives_three_prompts() {
    let (store, id) = seeded(StepId::Assessment).await;
    let provider = MockAIProvider::offline();
    let engine = engine_with(provider.clone(), Arc::new(store));

    let record = engine.process_utterance(id, "not sure help me").await.unwrap();

    assert_eq!(record.strategy, Some(StrategyKind::StayAndClarify));
    assert_eq!(record.current_step, StepId::Assessment);
    assert_eq!(record.suggestions.len(), 3);

    let calls = provider.get_calls();
    let system = calls[0].system_prompt.as_deref().unwrap();
    assert!(system.contains("exactly 3 suggestions"));
}

#[tokio::test]
async fn repeated_help_triggers_nudge() {
    let (store, id) = seeded(StepId::Challenge).await;
    let engine = engine_with(MockAIProvider::offline(), Arc::new(store));

    engine.process_utterance(id, "help").await.unwrap();
    let nudge = engine.process_utterance(id, "help me please").await.unwrap();

    assert_eq!(nudge.strategy, Some(StrategyKind::StayAndClarify));
    assert!(nudge.suggestions.is_empty());
    assert_eq!(nudge.current_step, StepId::Challenge);
}

// =============================================================================
// Backend failure, supersession, persistence
// =============================================================================

#[tokio::test]
async fn backend_failure_falls_back_to_local_text() {
    let provider = MockAIProvider::new().with_error(MockError::Unavailable {
        message: "overloaded".to_string(),
    });
    let engine = engine_with(provider, Arc::new(InMemoryProjectStore::new()));
    let id = engine.start_design(None).await.unwrap().record.project_id;

    let record = engine
        .process_utterance(id, "Water shapes how communities grow")
        .await
        .unwrap();

    assert_eq!(record.strategy, Some(StrategyKind::OfferRefinement));
    assert!(record.display_text.contains("refine it further"));
    assert!(matches!(
        record.warnings.as_slice(),
        [EngineWarning::BackendUnavailable(detail)] if detail.contains("overloaded")
    ));
}

#[tokio::test]
async fn newer_utterance_wins() {
    let provider = MockAIProvider::offline().with_delay(Duration::from_millis(300));
    let engine = engine_with(provider, Arc::new(InMemoryProjectStore::new()));
    let id = engine.start_design(None).await.unwrap().record.project_id;

    let first = engine.process_utterance(id, "Water shapes how communities grow");
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine
            .process_utterance(id, "Rivers connect every neighborhood")
            .await
    };
    let (first, second) = futures::join!(first, second);

    assert!(matches!(first, Err(ProcessUtteranceError::Superseded)));
    let second = second.unwrap();
    assert!(second.display_text.contains("Rivers connect every neighborhood"));
    assert_eq!(second.revision, 1);
}

#[tokio::test]
async fn committed_design_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let engine = engine_with(
            MockAIProvider::offline(),
            Arc::new(FileProjectStore::new(dir.path())),
        );
        let id = engine.start_design(None).await.unwrap().record.project_id;
        engine
            .process_utterance(id, "Water shapes how communities grow")
            .await
            .unwrap();
        engine.process_utterance(id, "sounds good").await.unwrap();
        id
    };

    let engine = engine_with(
        MockAIProvider::offline(),
        Arc::new(FileProjectStore::new(dir.path())),
    );
    let resumed = engine.start_design(Some(id)).await.unwrap();
    assert!(resumed.resumed);
    assert_eq!(resumed.record.current_step, StepId::EssentialQuestion);

    let context = engine.design_context(id).await.unwrap();
    assert_eq!(
        context.data.ideation.big_idea.as_deref(),
        Some("Water shapes how communities grow")
    );
    assert_eq!(context.revision, 2);
}

// =============================================================================
// Editing
// =============================================================================

#[tokio::test]
async fn edited_step_is_replaced_and_flow_resumes() {
    let (store, id) = seeded(StepId::Challenge).await;
    let engine = engine_with(MockAIProvider::offline(), Arc::new(store.clone()));

    let edit = engine.request_edit(id, StepId::BigIdea).await.unwrap();
    assert_eq!(edit.current_step, StepId::BigIdea);
    assert!(edit.display_text.starts_with("Let's revisit your big idea."));

    engine
        .process_utterance(id, "Rivers connect every neighborhood")
        .await
        .unwrap();
    let accepted = engine.process_utterance(id, "sounds good").await.unwrap();

    assert_eq!(accepted.current_step, StepId::Challenge);
    let saved = store.load(id).await.unwrap().unwrap();
    assert_eq!(
        saved.data().ideation.big_idea.as_deref(),
        Some("Rivers connect every neighborhood")
    );
    assert_eq!(saved.editing(), None);
}
