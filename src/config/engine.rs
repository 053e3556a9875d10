//! Flow engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::flow::SelectorConfig;

/// Conversation flow tuning
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Consecutive help requests before the "lock something in" nudge
    #[serde(default = "default_help_loop_threshold")]
    pub help_loop_threshold: u32,

    /// Trailing turns kept per session and sent to the backend
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Seconds to wait for the backend before falling back to local text
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_secs: u64,

    /// Coaching prompts shown on help and rejection turns
    #[serde(default = "default_coaching_prompt_count")]
    pub coaching_prompt_count: usize,

    /// Word count above which a failed validation is coached rather than
    /// treated as a request for elaboration
    #[serde(default = "default_min_content_words")]
    pub min_content_words: usize,
}

impl EngineConfig {
    /// Backend timeout as Duration
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Selector settings derived from this section
    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            help_loop_threshold: self.help_loop_threshold,
            min_content_words: self.min_content_words,
            coaching_prompt_count: self.coaching_prompt_count,
        }
    }

    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.help_loop_threshold == 0 {
            return Err(ValidationError::InvalidHelpLoopThreshold);
        }
        if self.history_window < 2 {
            return Err(ValidationError::InvalidHistoryWindow);
        }
        if self.backend_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if !(1..=3).contains(&self.coaching_prompt_count) {
            return Err(ValidationError::InvalidCoachingPromptCount);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            help_loop_threshold: default_help_loop_threshold(),
            history_window: default_history_window(),
            backend_timeout_secs: default_backend_timeout(),
            coaching_prompt_count: default_coaching_prompt_count(),
            min_content_words: default_min_content_words(),
        }
    }
}

fn default_help_loop_threshold() -> u32 {
    2
}

fn default_history_window() -> usize {
    12
}

fn default_backend_timeout() -> u64 {
    30
}

fn default_coaching_prompt_count() -> usize {
    3
}

fn default_min_content_words() -> usize {
    3
}
