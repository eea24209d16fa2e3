//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `ai_max_tokens` is 0 or exceeds 4096
    /// - `ai_temperature` is outside 0.0..=2.0
    /// - `ai_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `ai_model` or `api_base_url` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai_max_tokens == 0 {
            return Err(ConfigError::Invalid {
                field: "ai_max_tokens".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.ai_max_tokens > 4096 {
            return Err(ConfigError::Invalid {
                field: "ai_max_tokens".into(),
                reason: "must not exceed 4096".into(),
            });
        }

        if !(0.0..=2.0).contains(&self.ai_temperature) {
            return Err(ConfigError::Invalid {
                field: "ai_temperature".into(),
                reason: "must be between 0.0 and 2.0".into(),
            });
        }

        if self.ai_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "ai_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.ai_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "ai_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.ai_model.is_empty() {
            return Err(ConfigError::Invalid { field: "ai_model".into(), reason: "must not be empty".into() });
        }

        if self.api_base_url.is_empty() {
            return Err(ConfigError::Invalid { field: "api_base_url".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
