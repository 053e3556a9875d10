//! AI Adapters.
//!
//! Implementations of the AIProvider port, plus the design backend that
//! turns a provider into assistant replies.
//!
//! ## Available Adapters
//!
//! - `AnthropicProvider` - Anthropic Claude models
//! - `MockAIProvider` - Configurable mock for tests and offline sessions
//! - `CompletionBackend` - `DesignBackend` over any `AIProvider`

mod anthropic_provider;
mod completion_backend;
mod mock_provider;
mod reply_parser;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider};
pub use completion_backend::CompletionBackend;
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use reply_parser::{ReplyParser, ResponseSanitizer, SanitizationError};
