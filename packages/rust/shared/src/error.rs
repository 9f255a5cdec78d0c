//! Error types for reportgen.
//!
//! Library crates use [`ReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every variant maps onto one [`ErrorKind`]. The pipeline coordinator
//! matches on the kind to decide whether a stage failure is fatal or
//! recoverable, so new variants must pick a kind deliberately.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Coarse error taxonomy used for fatal-vs-recoverable decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The generation or rendering backend could not be reached.
    ServiceUnreachable,
    /// Structured output was expected but could not be parsed.
    MalformedResponse,
    /// Parsed output failed a shape or content check.
    ValidationFailure,
    /// An optional collaborator (exporter, renderer) is absent.
    CapabilityUnavailable,
    /// An unsupported parameter or invalid configuration.
    ConfigurationInvalid,
    /// Filesystem failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceUnreachable => "service_unreachable",
            Self::MalformedResponse => "malformed_response",
            Self::ValidationFailure => "validation_failure",
            Self::CapabilityUnavailable => "capability_unavailable",
            Self::ConfigurationInvalid => "configuration_invalid",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all reportgen operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Generation or rendering backend could not be contacted or refused the call.
    #[error("service unreachable: {0}")]
    ServiceUnreachable(String),

    /// Backend reply could not be parsed into the expected structure.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Data validation error (empty topic, outline/section mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// An optional capability (exporter, renderer) is not available.
    #[error("capability unavailable: {capability}")]
    CapabilityUnavailable { capability: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a capability-unavailable error naming the missing capability.
    pub fn unavailable(capability: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::ConfigurationInvalid,
            Self::ServiceUnreachable(_) => ErrorKind::ServiceUnreachable,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Validation { .. } => ErrorKind::ValidationFailure,
            Self::CapabilityUnavailable { .. } => ErrorKind::CapabilityUnavailable,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}
