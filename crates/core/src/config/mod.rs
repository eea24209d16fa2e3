//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LITMARK_*)
//! 2. TOML config file (if LITMARK_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Persisted settings and the bundled key file (see [`keyfile`]) layer
//! on top via [`AppConfig::apply_settings`]; that path is owned by the
//! storage coordinator so the key file is consulted at most once.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod keyfile;
mod validation;

pub use keyfile::{RECOGNIZED_KEYS, load_key_file, parse_key_file};
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LITMARK_*)
/// 2. TOML config file (if LITMARK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the summarization provider.
    ///
    /// Resolved from persisted settings, then the bundled key file,
    /// then the LITMARK_OPENAI_API_KEY environment variable.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Chat model requested from the provider.
    #[serde(default = "default_model")]
    pub ai_model: String,

    /// Response token cap per summarization call.
    #[serde(default = "default_max_tokens")]
    pub ai_max_tokens: u32,

    /// Sampling temperature for summarization calls.
    #[serde(default = "default_temperature")]
    pub ai_temperature: f64,

    /// Outbound HTTP timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub ai_timeout_ms: u64,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub api_base_url: String,

    /// Path to the SQLite store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Optional bundled KEY=VALUE credential file.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./litmark.sqlite")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            ai_model: default_model(),
            ai_max_tokens: default_max_tokens(),
            ai_temperature: default_temperature(),
            ai_timeout_ms: default_timeout_ms(),
            api_base_url: default_base_url(),
            db_path: default_db_path(),
            key_file: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LITMARK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LITMARK_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Overlay persisted settings (the recognized option set) onto this
    /// configuration. Unparseable numeric values are ignored.
    pub fn apply_settings(&mut self, settings: &BTreeMap<String, String>) {
        if let Some(key) = settings.get("OPENAI_API_KEY")
            && !key.is_empty()
        {
            self.openai_api_key = Some(key.clone());
        }
        if let Some(model) = settings.get("AI_MODEL")
            && !model.is_empty()
        {
            self.ai_model = model.clone();
        }
        if let Some(tokens) = settings.get("AI_MAX_TOKENS")
            && let Ok(tokens) = tokens.parse()
        {
            self.ai_max_tokens = tokens;
        }
        if let Some(temp) = settings.get("AI_TEMPERATURE")
            && let Ok(temp) = temp.parse()
        {
            self.ai_temperature = temp;
        }
        if let Some(timeout) = settings.get("AI_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.ai_timeout_ms = timeout;
        }
    }

    /// Check that an API key is available (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no key is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "openai_api_key".into(),
                hint: "Set OPENAI_API_KEY in settings or the bundled key file".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ai_model, "gpt-4o-mini");
        assert_eq!(config.ai_max_tokens, 150);
        assert_eq!(config.ai_timeout_ms, 10_000);
        assert_eq!(config.db_path, PathBuf::from("./litmark.sqlite"));
        assert!(config.openai_api_key.is_none());
        assert!(config.key_file.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_require_api_key_missing() {
        let config = AppConfig::default();
        assert!(matches!(config.require_api_key(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_api_key_empty_string() {
        let config = AppConfig { openai_api_key: Some(String::new()), ..Default::default() };
        assert!(matches!(config.require_api_key(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_api_key_present() {
        let config = AppConfig { openai_api_key: Some("sk-test".into()), ..Default::default() };
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_apply_settings() {
        let mut config = AppConfig::default();
        let mut settings = BTreeMap::new();
        settings.insert("OPENAI_API_KEY".to_string(), "sk-abc".to_string());
        settings.insert("AI_MODEL".to_string(), "gpt-4o".to_string());
        settings.insert("AI_MAX_TOKENS".to_string(), "300".to_string());
        settings.insert("AI_TEMPERATURE".to_string(), "0.2".to_string());
        settings.insert("AI_TIMEOUT".to_string(), "5000".to_string());

        config.apply_settings(&settings);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-abc"));
        assert_eq!(config.ai_model, "gpt-4o");
        assert_eq!(config.ai_max_tokens, 300);
        assert!((config.ai_temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.ai_timeout_ms, 5000);
    }

    #[test]
    fn test_apply_settings_ignores_garbage_numbers() {
        let mut config = AppConfig::default();
        let mut settings = BTreeMap::new();
        settings.insert("AI_MAX_TOKENS".to_string(), "lots".to_string());
        config.apply_settings(&settings);
        assert_eq!(config.ai_max_tokens, 150);
    }
}
