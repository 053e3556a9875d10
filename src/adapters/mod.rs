//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - LLM providers and the completion-backed design backend
//! - `storage` - Project stores (in-memory, YAML files)

pub mod ai;
pub mod storage;

pub use ai::{AnthropicConfig, AnthropicProvider, CompletionBackend, MockAIProvider};
pub use storage::{FileProjectStore, InMemoryProjectStore};
