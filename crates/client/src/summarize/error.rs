//! Summarization client error types.

use std::sync::Arc;
use std::time::Duration;

/// Errors from the summarization API client and its admission control.
///
/// Clone because a single in-flight result is fanned out to every
/// caller that deduplicated onto it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SummarizeError {
    /// No API key configured.
    #[error("missing API key: no credential in settings or key file")]
    MissingApiKey,

    /// Admission denied by the sliding-window rate limiter.
    #[error("rate limited: retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Response parsed but carried no usable summary text.
    #[error("empty summary in response")]
    EmptySummary,
}

impl From<reqwest::Error> for SummarizeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SummarizeError::Timeout } else { SummarizeError::Network(Arc::new(err)) }
    }
}

impl From<SummarizeError> for litmark_core::Error {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::MissingApiKey => litmark_core::Error::ConfigMissing(
                "no API key configured; add OPENAI_API_KEY in settings".into(),
            ),
            SummarizeError::RateLimited { retry_after } => {
                litmark_core::Error::RateLimited { retry_after_secs: retry_after.as_secs() }
            }
            SummarizeError::MalformedResponse(msg) => litmark_core::Error::MalformedResponse(msg),
            SummarizeError::EmptySummary => litmark_core::Error::MalformedResponse("empty summary".into()),
            other => litmark_core::Error::Upstream(other.to_string()),
        }
    }
}
