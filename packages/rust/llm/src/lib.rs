//! Text generation client for reportgen.
//!
//! Stages talk to a [`GenerationService`]: `generate(prompt, max_output)`
//! always yields a [`Generation`]. When the backend cannot be reached or
//! answers with garbage, the service hands back a diagnostic placeholder
//! instead of an error, tagged with the [`ErrorKind`] so stages can switch to
//! their fallback output.
//!
//! This crate provides:
//! - [`LlmClient`]: the production service, retrying a [`ChatBackend`]
//! - [`OpenAiBackend`]: OpenAI-compatible `/chat/completions` (OpenAI, vLLM)
//! - [`DemoBackend`]: offline canned replies

mod backend;
mod client;
mod demo;
mod error;

use async_trait::async_trait;
use reportgen_shared::{ErrorKind, ReportError, Result};

pub use backend::{ChatBackend, CompletionRequest, OpenAiBackend};
pub use client::{ClientSettings, LlmClient};
pub use demo::DemoBackend;
pub use error::BackendError;

/// Where a [`Generation`]'s text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Real model output.
    Model,
    /// Diagnostic placeholder produced because the call failed.
    Placeholder(ErrorKind),
}

/// Output of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub origin: Origin,
}

impl Generation {
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::Model,
        }
    }

    /// Diagnostic stand-in for a failed call.
    pub fn placeholder(kind: ErrorKind, detail: &str) -> Self {
        Self {
            text: format!("[generation unavailable: {kind}] {detail}"),
            origin: Origin::Placeholder(kind),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.origin, Origin::Placeholder(_))
    }

    /// Model text, or the failure that produced the placeholder.
    pub fn into_result(self) -> Result<String> {
        match self.origin {
            Origin::Model => Ok(self.text),
            Origin::Placeholder(kind) => Err(placeholder_error(kind, self.text)),
        }
    }
}

fn placeholder_error(kind: ErrorKind, text: String) -> ReportError {
    match kind {
        ErrorKind::MalformedResponse => ReportError::malformed(text),
        ErrorKind::ValidationFailure => ReportError::validation(text),
        ErrorKind::CapabilityUnavailable => ReportError::unavailable(text),
        ErrorKind::ConfigurationInvalid => ReportError::config(text),
        ErrorKind::ServiceUnreachable | ErrorKind::Io => ReportError::ServiceUnreachable(text),
    }
}

/// The text generation capability stages depend on.
///
/// Implementations must not fail: any transport, auth, or service problem is
/// reported through [`Generation::placeholder`].
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str, max_output: u32) -> Generation;

    /// Short description for status output (e.g. `openai/gpt-4o-mini`).
    fn describe(&self) -> String {
        "generation-service".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_generation_converts_to_ok() {
        let g = Generation::model("hello");
        assert!(!g.is_placeholder());
        assert_eq!(g.into_result().unwrap(), "hello");
    }

    #[test]
    fn placeholder_carries_kind_into_error() {
        let g = Generation::placeholder(ErrorKind::ServiceUnreachable, "connection refused");
        assert!(g.is_placeholder());
        assert!(g.text.contains("connection refused"));
        let err = g.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnreachable);

        let g = Generation::placeholder(ErrorKind::MalformedResponse, "no choices");
        assert_eq!(g.into_result().unwrap_err().kind(), ErrorKind::MalformedResponse);
    }
}
