//! Flow module - Deciding how to respond to each utterance.
//!
//! Pure, deterministic pieces of the conversational core:
//!
//! - `classifier` - Tags utterances (help, what-if, suggestion, confirmation)
//! - `validator` - Per-step content rules
//! - `strategy` - Decision table picking one response strategy
//! - `extraction` - Best-effort concept extraction from what-if prompts
//! - `patch` - Re-validation of backend-proposed data patches
//! - `templates` - Local openings, coaching prompts, and fallback text

mod classifier;
mod extraction;
mod patch;
mod strategy;
pub mod templates;
mod validator;

pub use classifier::{classify, Classification};
pub use extraction::extract_what_if_concept;
pub use patch::{vet_patch, PatchRejection};
pub use strategy::{ClarifyReason, SelectorConfig, Strategy, StrategySelector, TurnAssessment};
pub use validator::{validate, validate_with, RejectionKind, ValidationOptions, Verdict};
