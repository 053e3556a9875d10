//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PBL_FLOW` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use pbl_flow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Help-loop threshold: {}", config.engine.help_loop_threshold);
//! ```

mod ai;
mod engine;
mod error;
mod storage;

pub use ai::{AiConfig, AiProvider};
pub use engine::EngineConfig;
pub use error::{ConfigError, ValidationError};
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// offline setup. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Conversation flow tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// AI provider configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Project persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PBL_FLOW` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PBL_FLOW__ENGINE__HELP_LOOP_THRESHOLD=3` -> `engine.help_loop_threshold = 3`
    /// - `PBL_FLOW__AI__ANTHROPIC_API_KEY=...` -> `ai.anthropic_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PBL_FLOW")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.ai.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
