//! Backend call failures.

use std::time::Duration;

use reportgen_shared::{ErrorKind, ReportError};

/// Errors a [`crate::ChatBackend`] can return.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the service.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered but the body was unusable.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Request timed out before any response.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Backend is misconfigured (bad URL, bad key format).
    #[error("configuration error: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) => true,
            Self::Malformed(_) | Self::Config(_) => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Timeout(_) => {
                ErrorKind::ServiceUnreachable
            }
            Self::Malformed(_) => ErrorKind::MalformedResponse,
            Self::Config(_) => ErrorKind::ConfigurationInvalid,
        }
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_error",
            Self::Status { .. } => "http_status",
            Self::Malformed(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config_error",
        }
    }
}

impl From<BackendError> for ReportError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Malformed(message) => ReportError::malformed(message),
            BackendError::Config(message) => ReportError::config(message),
            other => ReportError::ServiceUnreachable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let status = |s| BackendError::Status {
            status: s,
            message: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!BackendError::Malformed("x".into()).is_retryable());
    }

    #[test]
    fn converts_into_report_error_by_kind() {
        let err: ReportError = BackendError::Malformed("no choices".into()).into();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err: ReportError = BackendError::Status {
            status: 401,
            message: "bad key".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ServiceUnreachable);
    }
}
