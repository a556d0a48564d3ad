//! Environment-driven configuration, loaded once at startup.

use std::env;
use std::time::Duration;

use crate::errors::{IngestError, IngestResult};

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the service-account JSON key with domain-wide delegation.
    pub service_account_file: String,
    /// OAuth scope requested for delegated tokens.
    pub scope: String,
    /// Gmail API base URL.
    pub base_url: String,
    /// Per-request timeout for Gmail API calls.
    pub request_timeout: Duration,
    /// Address the webhook server binds to.
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from `MAILHOOK_*` environment variables.
    ///
    /// Only the service-account key path is required; everything else has a
    /// sensible default.
    pub fn load_from_env() -> IngestResult<Self> {
        Ok(Self {
            service_account_file: required_env("MAILHOOK_SERVICE_ACCOUNT_FILE")?,
            scope: optional_env("MAILHOOK_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            base_url: optional_env("MAILHOOK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: parse_timeout_secs(optional_env("MAILHOOK_REQUEST_TIMEOUT_SECS"))?,
            bind_addr: optional_env("MAILHOOK_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn required_env(key: &str) -> IngestResult<String> {
    env::var(key).map_err(|_| IngestError::Config(format!("{key} is not set")))
}

// Unset and empty are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_timeout_secs(raw: Option<String>) -> IngestResult<Duration> {
    let secs = match raw {
        Some(value) => value.parse::<u64>().map_err(|_| {
            IngestError::Config(format!(
                "MAILHOOK_REQUEST_TIMEOUT_SECS must be an integer number of seconds, got '{value}'"
            ))
        })?,
        None => DEFAULT_REQUEST_TIMEOUT_SECS,
    };
    Ok(Duration::from_secs(secs))
}
