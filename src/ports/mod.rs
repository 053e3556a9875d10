//! Ports - Interfaces between the design flow core and the outside world.
//!
//! - `ai_provider` - LLM completions
//! - `design_backend` - Strategy-biased reply generation
//! - `project_store` - Project persistence

mod ai_provider;
mod design_backend;
mod project_store;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, TokenUsage,
};
pub use design_backend::{BackendError, BackendReply, DesignBackend, PromptContext};
pub use project_store::{ProjectStore, StoreError};
