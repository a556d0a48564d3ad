//! Typed failure taxonomy for the ingestion core.

use thiserror::Error;

/// Failures the ingestion core can surface.
///
/// Validation and auth failures are permanent for a given notification;
/// upstream HTTP failures carry the status and body so a caller can decide
/// whether a retry is worthwhile.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed or incomplete notification payload.
    #[error("invalid notification: {0}")]
    Validation(String),
    /// Delegated-credential refresh failure for a specific user.
    #[error("token refresh failed for {user}: {reason}")]
    Auth { user: String, reason: String },
    /// Non-2xx response from the Gmail API.
    #[error("gmail api returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Transport-level failure (connect, timeout, body decode).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The core itself never retries; this split exists so a backoff layer
    /// can be added at the call site without touching pipeline control flow.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Http { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            IngestError::Transport(e) => e.is_timeout() || e.is_connect(),
            IngestError::Validation(_) | IngestError::Auth { .. } | IngestError::Config(_) => false,
        }
    }
}

/// Alias for fallible core operations.
pub type IngestResult<T> = Result<T, IngestError>;
