//! Chat completion backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;

/// Maximum response body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// A single chat completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A service that turns one prompt into one reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs (`openai`, `vllm`, `demo`).
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, req: &CompletionRequest<'_>) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible adapter
// ---------------------------------------------------------------------------

/// Adapter for any endpoint speaking the OpenAI `/chat/completions` API.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    name: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    /// Build an adapter. `api_key` is optional because local vLLM servers
    /// usually run without auth.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| BackendError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| BackendError::Config("invalid API key format".into()))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("reportgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            name: name.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Option<Vec<Choice>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &CompletionRequest<'_>) -> Result<String, BackendError> {
        let body = ChatApiRequest {
            model: &self.model,
            messages: [
                ApiMessage {
                    role: "system",
                    content: req.system,
                },
                ApiMessage {
                    role: "user",
                    content: req.prompt,
                },
            ],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        debug!(url = %self.chat_url(), max_tokens = req.max_tokens, "sending chat completion");

        let response = self.client.post(self.chat_url()).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatApiResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or_else(|| text.chars().take(MAX_ERROR_BODY).collect());
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatApiResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::Malformed(format!("invalid JSON body: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(BackendError::Malformed(err.message));
        }

        let content = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| BackendError::Malformed("no choices in response".into()))?;

        if content.trim().is_empty() {
            return Err(BackendError::Malformed("empty completion".into()));
        }

        Ok(content)
    }
}
