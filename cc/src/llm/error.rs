//! LLM error types

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use thiserror::Error;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest `retry-after` the clients will sleep for
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited by the provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify a non-success HTTP response
    ///
    /// A 429 becomes [`LlmError::RateLimited`] carrying the `retry-after`
    /// seconds when the provider sent them.
    pub fn from_status(status: u16, headers: &HeaderMap, message: String) -> Self {
        if status == 429 {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return LlmError::RateLimited { retry_after };
        }
        LlmError::ApiError { status, message }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Configuration(_) => false,
            LlmError::Json(_) => false,
        }
    }

    /// How long to wait before retry number `attempt` (1-based)
    ///
    /// Rate limits honour the provider's `retry-after`, capped at
    /// [`MAX_RETRY_AFTER`]; everything else backs off exponentially.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1)));
        match self {
            LlmError::RateLimited {
                retry_after: Some(retry_after),
            } => (*retry_after).min(MAX_RETRY_AFTER),
            _ => backoff,
        }
    }
}
