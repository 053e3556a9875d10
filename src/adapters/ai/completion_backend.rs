//! Completion Backend - DesignBackend implemented over any AIProvider.
//!
//! Builds a system prompt from the turn's [`PromptContext`], replays the
//! recent conversation, and parses whatever the model returns into a
//! [`BackendReply`].

use async_trait::async_trait;

use super::reply_parser::ReplyParser;
use crate::domain::design::{ConversationTurn, TurnRole};
use crate::ports::{
    AIError, AIProvider, BackendError, BackendReply, CompletionRequest, DesignBackend,
    MessageRole, PromptContext, RequestMetadata,
};

const SYSTEM_PREAMBLE: &str = "You are a warm, concise instructional coach helping an educator \
design a project-based learning unit one step at a time. Never decide on the educator's behalf \
that a step is finished; the application tracks progress and tells you what just happened.";

const REPLY_FORMAT: &str = r#"Reply with a single JSON object and nothing else:
{
  "displayText": "what the educator sees (2-4 sentences)",
  "suggestions": ["short option", "..."],
  "proposedDataPatch": {"stepId": "value for a later, still empty step"},
  "proposedNextStep": "stepId",
  "stageComplete": false
}
Only displayText is required."#;

/// Design backend backed by an LLM completion provider.
pub struct CompletionBackend<P: AIProvider> {
    provider: P,
    parser: ReplyParser,
    max_tokens: u32,
    temperature: f32,
}

impl<P: AIProvider> CompletionBackend<P> {
    pub fn new(provider: P) -> Self {
        let info = provider.provider_info();
        tracing::info!(
            provider = %info.name,
            model = %info.model,
            max_context_tokens = info.max_context_tokens,
            "Completion backend ready"
        );
        Self {
            provider,
            parser: ReplyParser::new(),
            max_tokens: 800,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn build_request(&self, context: &PromptContext) -> CompletionRequest {
        let metadata = RequestMetadata::new(context.project_id, uuid::Uuid::new_v4().to_string());
        let system = system_prompt(context);

        let reserved = self.max_tokens
            + self.provider.estimate_tokens(&system)
            + self.provider.estimate_tokens(&context.user_utterance);
        let budget = self
            .provider
            .provider_info()
            .max_context_tokens
            .saturating_sub(reserved);
        let history = self.fit_history(&context.recent_turns, budget);

        let mut request = CompletionRequest::new(metadata)
            .with_system_prompt(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        for turn in history {
            let role = match turn.role {
                TurnRole::User => MessageRole::User,
                TurnRole::Assistant => MessageRole::Assistant,
            };
            request = request.with_message(role, turn.text.clone());
        }

        request.with_message(MessageRole::User, context.user_utterance.clone())
    }

    /// Newest turns that fit in `budget` tokens, oldest dropped first.
    fn fit_history<'a>(&self, turns: &'a [ConversationTurn], budget: u32) -> &'a [ConversationTurn] {
        let mut used = 0u32;
        let mut start = turns.len();
        for (index, turn) in turns.iter().enumerate().rev() {
            used = used.saturating_add(self.provider.estimate_tokens(&turn.text));
            if used > budget {
                break;
            }
            start = index;
        }
        if start > 0 {
            tracing::debug!(dropped = start, budget, "Trimmed history to context window");
        }
        &turns[start..]
    }
}

/// Renders the system prompt for one turn.
fn system_prompt(context: &PromptContext) -> String {
    let data = serde_json::to_string_pretty(&context.data).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "{SYSTEM_PREAMBLE}\n\n\
         Stage: {stage}\n\
         Current step: {step} ({step_id})\n\
         Strategy: {strategy}\n\n\
         What to do in this reply:\n{directive}\n\n\
         Design so far:\n{data}\n",
        stage = context.stage.label(),
        step = context.step.label(),
        step_id = context.step.as_str(),
        strategy = context.strategy.as_str(),
        directive = context.directive,
    );

    if let Some(target) = &context.pending_target {
        prompt.push_str(&format!("\nThe step is being filled for: {target}\n"));
    }
    if let Some(value) = &context.proposed_value {
        prompt.push_str(&format!("\nValue under discussion: \"{value}\"\n"));
    }
    if context.requested_suggestions > 0 {
        prompt.push_str(&format!(
            "\nInclude exactly {} suggestions, each starting with \"What if\".\n",
            context.requested_suggestions
        ));
    }

    prompt.push('\n');
    prompt.push_str(REPLY_FORMAT);
    prompt
}

impl From<AIError> for BackendError {
    fn from(err: AIError) -> Self {
        match err {
            AIError::Timeout { timeout_secs } => BackendError::Timeout(u64::from(timeout_secs)),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl<P: AIProvider> DesignBackend for CompletionBackend<P> {
    async fn generate(&self, context: &PromptContext) -> Result<BackendReply, BackendError> {
        let request = self.build_request(context);
        let trace_id = request.metadata.trace_id.clone();

        let response = self.provider.complete(request).await?;

        tracing::debug!(
            project_id = %context.project_id,
            trace_id = %trace_id,
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Completion received"
        );

        self.parser
            .parse(&response.content)
            .map_err(|e| BackendError::InvalidReply(e.to_string()))
    }
}
