//! Error types for generation calls.

use thiserror::Error;

/// Errors returned by a generation backend.
#[derive(Debug, Clone, Error)]
pub enum BrainError {
    /// The API rejected the call because of rate limiting (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The API rejected the credentials (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Any other HTTP error status returned by the API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure before a status was received.
    #[error("network error: {0}")]
    Network(String),

    /// The backend is not configured (missing key, bad URL, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The API answered but produced no text.
    #[error("empty response")]
    EmptyResponse,

    /// The call did not finish within its timeout.
    #[error("generation timed out")]
    Timeout,
}

/// Operator-facing classification of a [`BrainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrainErrorKind {
    RateLimit,
    Authentication,
    Api,
    Unknown,
}

impl BrainErrorKind {
    /// Label used in logs and operator alerts.
    pub fn label(&self) -> &'static str {
        match self {
            BrainErrorKind::RateLimit => "Rate Limit",
            BrainErrorKind::Authentication => "Authentication Error",
            BrainErrorKind::Api => "API Error",
            BrainErrorKind::Unknown => "Unknown error",
        }
    }
}

impl std::fmt::Display for BrainErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl BrainError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => BrainError::RateLimited(message),
            401 | 403 => BrainError::Authentication(message),
            _ => BrainError::Api { status, message },
        }
    }

    /// Classify this error for alerting.
    pub fn kind(&self) -> BrainErrorKind {
        match self {
            BrainError::RateLimited(_) => BrainErrorKind::RateLimit,
            BrainError::Authentication(_) => BrainErrorKind::Authentication,
            BrainError::Api { .. } => BrainErrorKind::Api,
            BrainError::Network(_)
            | BrainError::Configuration(_)
            | BrainError::EmptyResponse
            | BrainError::Timeout => BrainErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(BrainError::from_status(429, "slow down").kind(), BrainErrorKind::RateLimit);
        assert_eq!(BrainError::from_status(401, "bad key").kind(), BrainErrorKind::Authentication);
        assert_eq!(BrainError::from_status(403, "forbidden").kind(), BrainErrorKind::Authentication);
        assert_eq!(BrainError::from_status(400, "bad request").kind(), BrainErrorKind::Api);
        assert_eq!(BrainError::from_status(503, "overloaded").kind(), BrainErrorKind::Api);
    }

    #[test]
    fn test_transport_errors_are_unknown() {
        assert_eq!(BrainError::Timeout.kind(), BrainErrorKind::Unknown);
        assert_eq!(BrainError::Network("reset".into()).kind(), BrainErrorKind::Unknown);
        assert_eq!(BrainError::EmptyResponse.kind(), BrainErrorKind::Unknown);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(BrainErrorKind::RateLimit.label(), "Rate Limit");
        assert_eq!(BrainErrorKind::Authentication.label(), "Authentication Error");
        assert_eq!(BrainErrorKind::Api.label(), "API Error");
        assert_eq!(BrainErrorKind::Unknown.to_string(), "Unknown error");
    }
}
