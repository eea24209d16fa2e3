//! Unified error types for litmark.
//!
//! One enum covers the whole taxonomy: validation and capacity
//! decisions, summarization admission/config/upstream failures, RPC
//! timeouts, and store faults. Upstream diagnostic detail is logged at
//! the boundary that produced it and never carried verbatim to users.

use tokio_rusqlite::rusqlite;

/// Unified error type for the litmark service and its callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing required fields on save or import.
    #[error("VALIDATION: {0}")]
    Validation(String),

    /// Summarization admission denied by the sliding-window limiter.
    #[error("RATE_LIMITED: retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window admits another call.
        retry_after_secs: u64,
    },

    /// No API credential available from settings or the bundled key file.
    #[error("CONFIG_MISSING: {0}")]
    ConfigMissing(String),

    /// The summarization call failed; detail is logged, not surfaced.
    #[error("UPSTREAM: {0}")]
    Upstream(String),

    /// The summarization response had an unusable shape.
    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(String),

    /// A page-to-service round trip exceeded its bound.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// The service task is gone or its channel is closed.
    #[error("SERVICE_UNAVAILABLE: {0}")]
    ServiceUnavailable(String),

    /// Store operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl Error {
    /// Message safe to show an end user.
    ///
    /// Upstream and parse failures collapse to a generic retry hint so
    /// provider internals never leak into UI surfaces.
    pub fn user_message(&self) -> String {
        match self {
            Error::Upstream(_) | Error::MalformedResponse(_) => {
                "Summary unavailable right now. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}
