//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Help-loop threshold must be at least 1")]
    InvalidHelpLoopThreshold,

    #[error("History window must hold at least 2 turns")]
    InvalidHistoryWindow,

    #[error("Coaching prompt count must be between 1 and 3")]
    InvalidCoachingPromptCount,

    #[error("Data directory must not be empty")]
    EmptyDataDir,
}
