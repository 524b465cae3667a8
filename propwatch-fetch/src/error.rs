//! Failure taxonomy for a single fetch

use std::time::Duration;

use propwatch_core::ValidationError;
use thiserror::Error;

/// Why a live fetch did not produce a value
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Response of {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Circuit breaker open")]
    BreakerOpen,
}

impl FetchError {
    /// Transient failures are worth retrying within the same fetch
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::TooLarge { .. } | Self::Validation(_) | Self::BreakerOpen => false,
        }
    }

    /// Shorthand for a payload that arrived but could not be used
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if e.is_decode() {
            return Self::Validation(e.to_string());
        }
        Self::Transport(e.to_string())
    }
}

impl From<ValidationError> for FetchError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(format!("malformed JSON: {}", e))
    }
}
