//! Summarization API client.
//!
//! Speaks an OpenAI-compatible chat-completions protocol:
//!
//! - **Endpoint**: `{base_url}/chat/completions`
//! - **Authentication**: `Authorization: Bearer` header.
//! - **Request**: JSON `{model, messages, max_tokens, temperature}`.
//! - **Response**: JSON `{choices: [{message: {content}}]}`; anything
//!   else is a hard failure, never partially parsed.
//!
//! The client is one outbound call; caching, in-flight deduplication,
//! and admission control live in the gateway that owns it. The
//! [`SummaryBackend`] trait is the seam the gateway mocks in tests.

pub mod error;
pub mod request;
pub mod response;

pub use error::SummarizeError;
pub use request::{ChatMessage, ChatRequest};
pub use response::ChatResponse;

use std::time::Duration;

use async_trait::async_trait;
use litmark_core::{AppConfig, Highlight};
use reqwest::header;

/// Default base URL for the summarization API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Summarization client configuration.
#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    /// Bearer credential for the provider.
    pub api_key: String,
    /// Base URL (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Model requested per call.
    pub model: String,
    /// Response token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SummarizeConfig {
    /// Build from a resolved application configuration.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when no credential is configured; this
    /// is checked before any network activity.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SummarizeError> {
        let api_key = config
            .require_api_key()
            .map_err(|_| SummarizeError::MissingApiKey)?
            .to_string();

        Ok(Self {
            api_key,
            base_url: config.api_base_url.clone(),
            model: config.ai_model.clone(),
            max_tokens: config.ai_max_tokens,
            temperature: config.ai_temperature,
            timeout: config.timeout(),
        })
    }
}

/// The outbound-call seam the gateway depends on.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Issue exactly one summarization call for the highlight.
    async fn summarize(&self, highlight: &Highlight) -> Result<String, SummarizeError>;
}

/// Summarization API client.
#[derive(Debug, Clone)]
pub struct SummarizeClient {
    http: reqwest::Client,
    config: SummarizeConfig,
}

impl SummarizeClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SummarizeConfig) -> Result<Self, SummarizeError> {
        if config.api_key.is_empty() {
            return Err(SummarizeError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SummarizeError::from)?;

        Ok(Self { http, config })
    }

    async fn call(&self, highlight: &Highlight) -> Result<String, SummarizeError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest::for_highlight(
            highlight,
            &self.config.model,
            self.config.max_tokens,
            self.config.temperature,
        );

        tracing::debug!(highlight = %highlight.id, model = %self.config.model, "requesting summary");

        let http_response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(SummarizeError::from)?;

        let status = http_response.status();
        tracing::debug!("summarization API response status: {status}");

        if status == 401 || status == 403 {
            return Err(SummarizeError::AuthError);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(SummarizeError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await.map_err(SummarizeError::from)?;
        let response: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| SummarizeError::MalformedResponse(e.to_string()))?;

        response.into_summary()
    }
}

#[async_trait]
impl SummaryBackend for SummarizeClient {
    async fn summarize(&self, highlight: &Highlight) -> Result<String, SummarizeError> {
        self.call(highlight).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new_missing_key() {
        let config = SummarizeConfig::default();
        assert!(matches!(SummarizeClient::new(config), Err(SummarizeError::MissingApiKey)));
    }

    #[test]
    fn test_client_new_with_key() {
        let config = SummarizeConfig { api_key: "sk-test".into(), ..Default::default() };
        assert!(SummarizeClient::new(config).is_ok());
    }

    #[test]
    fn test_config_from_app_config_missing_key() {
        let app = AppConfig::default();
        assert!(matches!(
            SummarizeConfig::from_app_config(&app),
            Err(SummarizeError::MissingApiKey)
        ));
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            openai_api_key: Some("sk-x".into()),
            ai_model: "gpt-4o".into(),
            ai_max_tokens: 99,
            ai_timeout_ms: 2000,
            ..Default::default()
        };
        let config = SummarizeConfig::from_app_config(&app).unwrap();
        assert_eq!(config.api_key, "sk-x");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 99);
        assert_eq!(config.timeout, Duration::from_secs(2));
    }
}
