//! Error types for the sqlwright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant, and every error maps to a
//! stable [`ErrorKind`] tag so callers can decide on retries without
//! string-matching messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all sqlwright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Response extraction ---
    #[error("Could not extract a SQL answer from the model output: {reason}")]
    Extraction { reason: String, raw: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The stable category tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Provider(e) => e.kind(),
            Self::Config { .. } => ErrorKind::ConfigError,
            Self::Extraction { .. } | Self::Serialization(_) | Self::Internal(_) => {
                ErrorKind::InternalError
            }
        }
    }

    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// The raw model output attached to an extraction failure, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Extraction { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// A serializable view of this error for callers and logs.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
            raw_output: self.raw_output().map(String::from),
        }
    }
}

/// Stable error category tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    ProviderError,
    ConfigError,
    RateLimit,
    Timeout,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::ProviderError => "provider_error",
            Self::ConfigError => "config_error",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
        }
    }

    /// Only transient backend conditions are retryable.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider not registered: {0}")]
    NotRegistered(String),

    #[error("Provider '{provider}' does not support {capability}")]
    Unsupported {
        provider: String,
        capability: String,
    },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Timeout(_) | Self::Cancelled(_) => ErrorKind::Timeout,
            _ => ErrorKind::ProviderError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn kinds_map_to_stable_tags() {
        assert_eq!(
            Error::InvalidRequest("x".into()).kind().as_str(),
            "invalid_request"
        );
        assert_eq!(Error::config("x").kind(), ErrorKind::ConfigError);
        assert_eq!(
            Error::from(ProviderError::NotRegistered("unknown".into())).kind(),
            ErrorKind::ProviderError
        );
        assert_eq!(
            Error::from(ProviderError::RateLimited { retry_after_secs: 5 }).kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            Error::from(ProviderError::Cancelled("ctrl-c".into())).kind(),
            ErrorKind::Timeout
        );
        let extraction = Error::Extraction {
            reason: "nothing".into(),
            raw: "hello".into(),
        };
        assert_eq!(extraction.kind(), ErrorKind::InternalError);
    }

    #[test]
    fn only_rate_limit_and_timeout_are_retryable() {
        assert!(Error::from(ProviderError::Timeout("slow".into())).is_retryable());
        assert!(Error::from(ProviderError::RateLimited { retry_after_secs: 1 }).is_retryable());
        assert!(!Error::InvalidRequest("missing prompt".into()).is_retryable());
        assert!(!Error::config("bad budget").is_retryable());
        assert!(!Error::from(ProviderError::NotRegistered("x".into())).is_retryable());
    }

    #[test]
    fn report_carries_raw_output() {
        let err = Error::Extraction {
            reason: "no strategy matched".into(),
            raw: "I cannot help".into(),
        };
        let report = err.report();
        assert_eq!(report.kind, ErrorKind::InternalError);
        assert!(!report.retryable);
        assert_eq!(report.raw_output.as_deref(), Some("I cannot help"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"internal_error\""));
    }
}
